//! 카탈로그 로더 -- YAML 카탈로그 파일을 디스크에서 로드하고 컴파일합니다.
//!
//! 로딩은 fail-fast입니다: 패턴/포맷 컴파일 에러, 알 수 없는 참조,
//! 순환 참조 중 하나라도 있으면 전체 로드가 실패합니다.
//! 사용되지 않는 프래그먼트와 공유 액션도 컴파일하여 에러를 드러냅니다.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use msgparse_core::config::TzOffset;
use msgparse_core::metrics as m;

use crate::action::{Action, ActionChain, Arg, DateFormat, DurationFormat, UrlComponent};
use crate::error::EngineError;
use crate::function::FunctionRegistry;
use crate::mapping::{Conversion, FieldMapper, FieldMapping, MappingTarget, WritePolicy};
use crate::matcher::MatcherId;

use super::types::{
    ActionDef, ActionKind, ArgDef, CatalogDef, MappingsDef, MatcherDef, MatcherKind, TargetDef,
};
use super::{Catalog, CatalogBuilder};

/// 카탈로그 파일 최대 크기
const MAX_CATALOG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
/// 카탈로그당 최대 규칙 수
const MAX_RULES_COUNT: usize = 100_000;

/// 카탈로그 로더
pub struct CatalogLoader;

impl CatalogLoader {
    /// YAML 파일에서 카탈로그를 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 10MB를 초과하는 경우
    /// - YAML 파싱, 검증, 컴파일에 실패한 경우
    pub async fn load_file(
        path: impl AsRef<Path>,
        functions: &FunctionRegistry,
    ) -> Result<Catalog, EngineError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| EngineError::CatalogLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_CATALOG_FILE_SIZE {
            return Err(EngineError::CatalogLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_CATALOG_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EngineError::CatalogLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let catalog = Self::parse_yaml(&content, &path.display().to_string(), functions)?;

        tracing::info!(
            path = %path.display(),
            catalog = %catalog.name(),
            rules = catalog.rule_count(),
            matchers = catalog.arena().len(),
            "loaded catalog"
        );

        Ok(catalog)
    }

    /// YAML 문자열을 파싱하여 카탈로그를 생성합니다.
    pub fn parse_yaml(
        yaml_str: &str,
        source: &str,
        functions: &FunctionRegistry,
    ) -> Result<Catalog, EngineError> {
        let def: CatalogDef =
            serde_yaml::from_str(yaml_str).map_err(|e| EngineError::CatalogLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        // 유효성 검증
        def.validate()?;

        Self::compile(&def, functions)
    }

    /// 검증된 정의를 컴파일합니다.
    pub fn compile(def: &CatalogDef, functions: &FunctionRegistry) -> Result<Catalog, EngineError> {
        let rule_count = def.rule_count();
        if rule_count > MAX_RULES_COUNT {
            return Err(EngineError::CatalogValidation {
                rule_id: def.name.clone(),
                reason: format!("too many rules: {rule_count} (max {MAX_RULES_COUNT})"),
            });
        }

        let mut compiler = Compiler::new(def, functions);
        for name in def.fragments.keys() {
            compiler.fragment(name)?;
        }
        for name in def.actions.keys() {
            compiler.shared_action(name)?;
        }

        for rule in &def.headers {
            let matcher = compiler.matcher(&rule.matcher, &rule.id)?;
            let actions = compiler.chain(&rule.actions, &rule.id)?;
            compiler.builder.add_header(&rule.id, matcher, actions)?;
        }

        for (msgid, rules) in &def.messages {
            for rule in rules {
                let matcher = compiler.matcher(&rule.matcher, &rule.id)?;
                let actions = compiler.chain(&rule.actions, &rule.id)?;
                compiler
                    .builder
                    .add_message(msgid, &rule.id, matcher, actions)?;
            }
        }

        if let Some(mappings) = &def.mappings {
            compile_mappings(mappings, compiler.builder.mapper_mut())?;
        }

        let interned_actions = compiler.interned.len();
        let catalog = compiler.builder.build()?;

        for finding in catalog.lint() {
            tracing::warn!(
                catalog = %catalog.name(),
                location = %finding.location,
                first = %finding.first,
                second = %finding.second,
                skeleton = %finding.skeleton,
                "near-duplicate candidates, later candidate is unreachable"
            );
        }

        tracing::debug!(
            catalog = %catalog.name(),
            rules = catalog.rule_count(),
            message_ids = catalog.message_ids().len(),
            interned_actions,
            mappings = catalog.mapper().len(),
            "compiled catalog"
        );
        metrics::gauge!(m::RULES_LOADED, m::LABEL_CATALOG => catalog.name().to_owned())
            .set(catalog.rule_count() as f64);

        Ok(catalog)
    }
}

/// 참조 해석과 인터닝을 담당하는 컴파일 상태
struct Compiler<'a> {
    def: &'a CatalogDef,
    functions: &'a FunctionRegistry,
    builder: CatalogBuilder,
    fragments: HashMap<&'a str, MatcherId>,
    fragments_in_progress: HashSet<&'a str>,
    shared_actions: HashMap<&'a str, Arc<Action>>,
    actions_in_progress: HashSet<&'a str>,
    interned: HashMap<Action, Arc<Action>>,
}

impl<'a> Compiler<'a> {
    fn new(def: &'a CatalogDef, functions: &'a FunctionRegistry) -> Self {
        Self {
            def,
            functions,
            builder: CatalogBuilder::new(def.name.clone()),
            fragments: HashMap::new(),
            fragments_in_progress: HashSet::new(),
            shared_actions: HashMap::new(),
            actions_in_progress: HashSet::new(),
            interned: HashMap::new(),
        }
    }

    fn fragment(&mut self, name: &str) -> Result<MatcherId, EngineError> {
        if let Some(id) = self.fragments.get(name) {
            return Ok(*id);
        }
        let def = self.def;
        let (key, matcher) =
            def.fragments
                .get_key_value(name)
                .ok_or_else(|| EngineError::UnknownReference {
                    kind: "fragment",
                    name: name.to_owned(),
                })?;

        if !self.fragments_in_progress.insert(key.as_str()) {
            return Err(EngineError::CyclicReference {
                kind: "fragment",
                name: name.to_owned(),
            });
        }
        let id = self.matcher(matcher, key)?;
        self.fragments_in_progress.remove(key.as_str());
        self.fragments.insert(key.as_str(), id);
        Ok(id)
    }

    fn matcher(&mut self, def: &MatcherDef, context: &str) -> Result<MatcherId, EngineError> {
        let kind = def.kind().ok_or_else(|| EngineError::CatalogValidation {
            rule_id: context.to_owned(),
            reason: "matcher must set exactly one of pattern, sequence, alternative, ref"
                .to_owned(),
        })?;

        match kind {
            MatcherKind::Pattern(src) => self
                .builder
                .arena_mut()
                .pattern(src)
                .map_err(|e| EngineError::compile(context, e)),
            MatcherKind::Sequence(steps) => {
                let ids = self.children(steps, context)?;
                self.builder
                    .arena_mut()
                    .sequence(ids)
                    .map_err(|e| EngineError::compile(context, e))
            }
            MatcherKind::Alternative(candidates) => {
                let ids = self.children(candidates, context)?;
                self.builder
                    .arena_mut()
                    .alternative(ids)
                    .map_err(|e| EngineError::compile(context, e))
            }
            MatcherKind::Reference(name) => self.fragment(name),
        }
    }

    fn children(
        &mut self,
        defs: &[MatcherDef],
        context: &str,
    ) -> Result<Vec<MatcherId>, EngineError> {
        defs.iter().map(|def| self.matcher(def, context)).collect()
    }

    fn shared_action(&mut self, name: &str) -> Result<Arc<Action>, EngineError> {
        if let Some(action) = self.shared_actions.get(name) {
            return Ok(Arc::clone(action));
        }
        let def = self.def;
        let (key, action) =
            def.actions
                .get_key_value(name)
                .ok_or_else(|| EngineError::UnknownReference {
                    kind: "action",
                    name: name.to_owned(),
                })?;

        if !self.actions_in_progress.insert(key.as_str()) {
            return Err(EngineError::CyclicReference {
                kind: "action",
                name: name.to_owned(),
            });
        }
        let compiled = self.action(action, key)?;
        self.actions_in_progress.remove(key.as_str());
        self.shared_actions.insert(key.as_str(), Arc::clone(&compiled));
        Ok(compiled)
    }

    fn chain(&mut self, defs: &[ActionDef], context: &str) -> Result<ActionChain, EngineError> {
        let actions = defs
            .iter()
            .map(|def| self.action(def, context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ActionChain::new(actions))
    }

    fn action(&mut self, def: &ActionDef, context: &str) -> Result<Arc<Action>, EngineError> {
        let kind = def.kind().ok_or_else(|| invalid(context, "action must set exactly one kind"))?;

        let action = match kind {
            ActionKind::Reference(name) => return self.shared_action(name),
            ActionKind::Set(set) => Action::SetConstant {
                dest: dest(&set.dest, context)?,
                value: set.value.clone(),
            },
            ActionKind::Copy(copy) => Action::CopyField {
                dest: dest(&copy.dest, context)?,
                source: copy.source.clone(),
            },
            ActionKind::Raw(raw) => Action::CopyRaw {
                dest: dest(&raw.dest, context)?,
            },
            ActionKind::Call(call) => {
                if !self.functions.contains(&call.function) {
                    tracing::warn!(
                        rule = %context,
                        function = %call.function,
                        "function is not registered, action will leave its destination unset"
                    );
                }
                Action::Invoke {
                    dest: dest(&call.dest, context)?,
                    function: call.function.clone(),
                    args: call
                        .args
                        .iter()
                        .map(|a| arg(a, context))
                        .collect::<Result<_, _>>()?,
                }
            }
            ActionKind::DateTime(dt) => {
                let formats = dt
                    .formats
                    .iter()
                    .map(|f| DateFormat::compile(f).map_err(|e| EngineError::compile(context, e)))
                    .collect::<Result<Vec<_>, _>>()?;
                let tz = dt
                    .tz
                    .as_deref()
                    .map(|tz| {
                        TzOffset::parse(tz)
                            .ok_or_else(|| invalid(context, &format!("invalid tz offset '{tz}'")))
                    })
                    .transpose()?;
                Action::ParseDateTime {
                    dest: dest(&dt.dest, context)?,
                    sources: sources(&dt.args, context)?,
                    formats: non_empty(formats, context, "date_time")?,
                    tz,
                }
            }
            ActionKind::Duration(duration) => {
                let formats = duration
                    .formats
                    .iter()
                    .map(|f| {
                        DurationFormat::compile(f).map_err(|e| EngineError::compile(context, e))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Action::ParseDuration {
                    dest: dest(&duration.dest, context)?,
                    sources: sources(&duration.args, context)?,
                    formats: non_empty(formats, context, "duration")?,
                }
            }
            ActionKind::Lookup(lookup) => Action::Lookup {
                dest: dest(&lookup.dest, context)?,
                key: arg(&lookup.key, context)?,
                table: lookup.table.clone(),
                default: lookup.default.clone(),
            },
            ActionKind::Remove(fields) => Action::Remove {
                fields: fields.to_vec(),
            },
            ActionKind::Url(url) => Action::UrlPart {
                dest: dest(&url.dest, context)?,
                source: url.source.clone(),
                part: UrlComponent::from_name(&url.part).ok_or_else(|| {
                    invalid(context, &format!("unknown url component '{}'", url.part))
                })?,
            },
        };

        Ok(self.intern(action))
    }

    fn intern(&mut self, action: Action) -> Arc<Action> {
        if let Some(shared) = self.interned.get(&action) {
            return Arc::clone(shared);
        }
        let shared = Arc::new(action.clone());
        self.interned.insert(action, Arc::clone(&shared));
        shared
    }
}

fn compile_mappings(def: &MappingsDef, mapper: &mut FieldMapper) -> Result<(), EngineError> {
    if let Some(field) = &def.time_field {
        if field.is_empty() {
            return Err(invalid("mappings", "time_field must not be empty"));
        }
        mapper
            .set_time_field(field)
            .map_err(|e| EngineError::compile("mappings", e))?;
    }

    for (source, mapping) in &def.fields {
        let context = format!("mappings.{source}");
        if mapping.to.is_empty() {
            return Err(invalid(&context, "mapping requires at least one target"));
        }
        let conversion = mapping
            .convert
            .as_deref()
            .map(|name| {
                Conversion::from_name(name)
                    .ok_or_else(|| invalid(&context, &format!("unknown conversion '{name}'")))
            })
            .transpose()?;
        let targets = mapping
            .to
            .iter()
            .map(|target| mapping_target(target, &context))
            .collect::<Result<Vec<_>, _>>()?;
        mapper.insert(source.clone(), FieldMapping { conversion, targets });
    }
    Ok(())
}

fn mapping_target(def: &TargetDef, context: &str) -> Result<MappingTarget, EngineError> {
    if def.field.is_empty() {
        return Err(invalid(context, "mapping target field must not be empty"));
    }
    let policy = match (def.setter.as_deref().unwrap_or("set"), def.prio) {
        ("set", None) => WritePolicy::Set,
        ("append", None) => WritePolicy::Append,
        ("prio", Some(prio)) => WritePolicy::Priority(prio),
        ("prio", None) => return Err(invalid(context, "setter 'prio' requires prio")),
        ("set" | "append", Some(_)) => {
            return Err(invalid(context, "prio is only valid with setter 'prio'"));
        }
        (other, _) => return Err(invalid(context, &format!("unknown setter '{other}'"))),
    };
    Ok(MappingTarget {
        field: def.field.clone(),
        policy,
    })
}

fn invalid(context: &str, reason: &str) -> EngineError {
    EngineError::CatalogValidation {
        rule_id: context.to_owned(),
        reason: reason.to_owned(),
    }
}

fn dest(dest: &str, context: &str) -> Result<String, EngineError> {
    if dest.is_empty() {
        return Err(invalid(context, "action dest must not be empty"));
    }
    Ok(dest.to_owned())
}

fn sources(args: &[String], context: &str) -> Result<Vec<String>, EngineError> {
    if args.is_empty() {
        return Err(invalid(context, "action requires at least one source field"));
    }
    Ok(args.to_vec())
}

fn non_empty<T>(formats: Vec<T>, context: &str, action: &str) -> Result<Vec<T>, EngineError> {
    if formats.is_empty() {
        return Err(invalid(
            context,
            &format!("{action} requires at least one format"),
        ));
    }
    Ok(formats)
}

fn arg(def: &ArgDef, context: &str) -> Result<Arg, EngineError> {
    match (&def.field, &def.constant) {
        (Some(field), None) => Ok(Arg::Field(field.clone())),
        (None, Some(constant)) => Ok(Arg::Constant(constant.clone())),
        _ => Err(invalid(
            context,
            "argument must set exactly one of field, constant",
        )),
    }
}
