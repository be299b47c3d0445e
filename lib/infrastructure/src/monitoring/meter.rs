use cached::proc_macro::cached;
use opentelemetry::KeyValue;

/// Adds one to the named counter. A no-op until a meter provider is installed.
pub fn increment(name: &'static str, kv: &[(&str, &str)]) {
    let kv: Vec<KeyValue> = kv
        .iter()
        .map(|(k, v)| KeyValue::new(k.to_string(), v.to_string()))
        .collect();
    counter(name).add(1, &kv)
}

#[cached]
fn counter(name: &'static str) -> opentelemetry::metrics::Counter<u64> {
    opentelemetry::global::meter("micwatch").u64_counter(name).build()
}
