#![no_main]

use libfuzzer_sys::fuzz_target;
use msgparse_engine::{CatalogLoader, FunctionRegistry};

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        let functions = FunctionRegistry::with_builtins();
        if let Ok(catalog) = CatalogLoader::parse_yaml(yaml_str, "fuzz-input.yml", &functions) {
            let _ = catalog.lint();
        }
    }
});
