use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

use lru::LruCache;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::employee::Employee;
use crate::models::rule::{ParsedRule, Rule, RuleScope};
use crate::services::rule_parser::{self, ParseError};
use crate::utils::semantic;

const DEFAULT_PARSE_CACHE_CAPACITY: usize = 256;

type RuleIndex = HashMap<RuleScope, Arc<Vec<Rule>>>;

/// Read-mostly index of confirmed rules per employee/department, plus a
/// bounded cache of parse results keyed by semantic hash.
///
/// Writes rebuild only the affected scope's entry and swap the map behind
/// an `Arc`, so readers never wait on a rebuild.
pub struct RuleStore {
    index: RwLock<Arc<RuleIndex>>,
    parse_cache: Mutex<LruCache<String, ParsedRule>>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_PARSE_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("non-zero cache capacity");
        Self {
            index: RwLock::new(Arc::new(HashMap::new())),
            parse_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parse rule text through the semantic cache. Only successful parses
    /// are cached; rejections are cheap to recompute and carry the raw
    /// text anyway.
    pub fn parse_cached(&self, text: &str) -> Result<ParsedRule, ParseError> {
        let key = semantic::semantic_hash(text);

        if let Ok(mut cache) = self.parse_cache.lock() {
            if let Some(parsed) = cache.get(&key) {
                debug!(target: "engine::rules", cache_key = %key, "parse cache hit");
                return Ok(parsed.clone());
            }
        }

        let parsed = rule_parser::parse(text)?;

        if let Ok(mut cache) = self.parse_cache.lock() {
            cache.put(key, parsed.clone());
        }

        Ok(parsed)
    }

    /// Parse free text and register the resulting rule under `scope`.
    pub fn submit_rule(&self, text: &str, scope: RuleScope) -> EngineResult<Rule> {
        let parsed = self.parse_cached(text)?;
        let rule = Rule::from_parsed(parsed, scope, text);
        self.insert(rule.clone());
        Ok(rule)
    }

    /// Register a confirmed rule, invalidating only its scope's entry.
    pub fn insert(&self, rule: Rule) {
        let scope = rule.scope();
        self.rebuild_scope(&scope, |rules| {
            rules.retain(|existing| existing.id != rule.id);
            rules.push(rule.clone());
            rules.sort_by(|a, b| a.id.cmp(&b.id));
        });
        debug!(target: "engine::rules", scope = ?scope, "rule registered");
    }

    /// Replace a confirmed rule with a re-parsed edit; the new rule gets a
    /// fresh id and a bumped version (confirmed rules stay immutable).
    pub fn revise_rule(&self, rule_id: &str, text: &str) -> EngineResult<Rule> {
        let existing = self
            .find_rule(rule_id)
            .ok_or_else(EngineError::not_found)?;
        let parsed = self.parse_cached(text)?;
        let mut revised = Rule::from_parsed(parsed, existing.scope(), text);
        revised.version = existing.version + 1;
        self.retire_rule(&existing.scope(), rule_id);
        self.insert(revised.clone());
        Ok(revised)
    }

    pub fn retire_rule(&self, scope: &RuleScope, rule_id: &str) {
        self.rebuild_scope(scope, |rules| {
            rules.retain(|existing| existing.id != rule_id);
        });
        debug!(target: "engine::rules", scope = ?scope, rule_id, "rule retired");
    }

    /// All rules binding an employee: employee-scoped first, then the
    /// department-wide ones, each sorted by id for deterministic output.
    pub fn rules_for(&self, employee: &Employee) -> Vec<Rule> {
        let index = self.snapshot();
        let mut merged = Vec::new();
        if let Some(rules) = index.get(&RuleScope::Employee(employee.id.clone())) {
            merged.extend(rules.iter().cloned());
        }
        if let Some(rules) = index.get(&RuleScope::Department(employee.department.clone())) {
            merged.extend(rules.iter().cloned());
        }
        merged
    }

    pub fn find_rule(&self, rule_id: &str) -> Option<Rule> {
        let index = self.snapshot();
        index
            .values()
            .flat_map(|rules| rules.iter())
            .find(|rule| rule.id == rule_id)
            .cloned()
    }

    fn snapshot(&self) -> Arc<RuleIndex> {
        self.index
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_default()
    }

    fn rebuild_scope(&self, scope: &RuleScope, mutate: impl FnOnce(&mut Vec<Rule>)) {
        let mut guard = match self.index.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next: RuleIndex = (**guard).clone();
        let mut rules = next
            .get(scope)
            .map(|entry| entry.as_ref().clone())
            .unwrap_or_default();
        mutate(&mut rules);
        if rules.is_empty() {
            next.remove(scope);
        } else {
            next.insert(scope.clone(), Arc::new(rules));
        }
        *guard = Arc::new(next);
    }
}
