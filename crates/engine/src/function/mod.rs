//! 외부 함수 레지스트리
//!
//! `Invoke` 액션이 호출하는 함수를 이름으로 등록합니다.
//! 레지스트리는 비어 있는 상태로 시작하며, 호스트가 필요한 함수만 등록합니다.
//! 엔진이 제공하는 기본 함수는 [`builtin`] 모듈에 있으며 명시적으로 등록해야 합니다.
//!
//! # 사용 예시
//! ```
//! use msgparse_engine::function::FunctionRegistry;
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register("UPPER", |args: &[&str]| Ok(args.concat().to_uppercase()));
//! assert_eq!(registry.call("UPPER", &["abc"]).unwrap(), "ABC");
//! ```

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FunctionError;

/// 등록 가능한 외부 함수 타입
pub type ExternalFn = dyn Fn(&[&str]) -> Result<String, FunctionError> + Send + Sync;

/// 외부 함수 레지스트리
///
/// 로드 이후에는 읽기 전용으로 공유됩니다 (`Arc<FunctionRegistry>`).
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<ExternalFn>>,
}

impl FunctionRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 함수(STRCAT, CALC, RMQ, DIRCHK)가 등록된 레지스트리를 생성합니다.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// 함수를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[&str]) -> Result<String, FunctionError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.functions.insert(name.clone(), Arc::new(function)).is_some() {
            tracing::debug!(function = %name, "replaced registered function");
        }
    }

    /// 함수가 등록되어 있는지 확인합니다.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// 함수를 호출합니다.
    ///
    /// # Errors
    /// 등록되지 않은 함수이거나 함수 자체가 실패한 경우
    pub fn call(&self, name: &str, args: &[&str]) -> Result<String, FunctionError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::Unknown(name.to_owned()))?;
        function(args)
    }

    /// 등록된 함수 이름 (정렬됨)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 등록된 함수 수
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
