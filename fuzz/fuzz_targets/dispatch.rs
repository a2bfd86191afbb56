#![no_main]

use std::sync::{Arc, LazyLock};

use libfuzzer_sys::fuzz_target;
use msgparse_core::config::TzOffset;
use msgparse_core::types::ParseStatus;
use msgparse_engine::{CatalogLoader, Dispatcher, EngineConfigBuilder, FunctionRegistry};

const DEMO_CATALOG: &str = include_str!("../../catalogs/demo.yml");

/// 데모 카탈로그 디스패처 (한 번만 컴파일)
static DISPATCHER: LazyLock<Option<Dispatcher>> = LazyLock::new(|| {
    let functions = FunctionRegistry::with_builtins();
    let catalog = CatalogLoader::parse_yaml(DEMO_CATALOG, "demo.yml", &functions).ok()?;
    let config = EngineConfigBuilder::new()
        .tz(TzOffset::Fixed(0))
        .max_line_bytes(4096)
        .build()
        .ok()?;
    Some(Dispatcher::new(Arc::new(catalog), Arc::new(functions), config))
});

fuzz_target!(|data: &[u8]| {
    let Some(dispatcher) = DISPATCHER.as_ref() else {
        return;
    };

    // 어떤 바이트열이든 패닉 없이 레코드 하나를 돌려줘야 한다
    let record = dispatcher.dispatch(data);

    if data.len() > 4096 {
        assert_eq!(record.status, ParseStatus::Oversized);
    }
    if record.is_parsed() {
        assert!(record.header_rule.is_some());
        assert!(record.message_rule.is_some());
    }
});
