use es_status::crd::Elasticsearch;
use kube::core::CustomResourceExt;

fn main() {
    let crd = Elasticsearch::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
    println!("{}", yaml);
}
