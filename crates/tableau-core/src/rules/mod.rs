//! Rule engine
//!
//! A rule pairs one trigger with a response, optionally gated by
//! conditions. Rules live on an actor's Rules component and are authored as
//! JSON:
//!
//! ```json
//! {
//!   "trigger":    { "name": "gain tag", "behaviorId": 17, "params": { "tag": "red" } },
//!   "conditions": [ { "name": "counter meets condition", "behaviorId": 21, "params": { .. } } ],
//!   "response":   { "name": "change counter", "behaviorId": 21, "params": { "change_by": 1 } }
//! }
//! ```
//!
//! Every element type is registered once in the [`RuleRegistry`] under its
//! name and owning behavior. Loading looks elements up by
//! `(behaviorId, name)`.
//!
//! Triggers are matched, never executed. A behavior fires one with
//! [`Scene::fire_if`](crate::Scene::fire_if), passing a predicate over the
//! trigger's params. Conditions are ANDed.
//!
//! Numeric params may hold an [`ExpressionRef`]: a literal, or an authored
//! `{"expressionType": "+", "params": {"lhs": 1, "rhs": {..}}}` tree built
//! from registered [`Expression`] types when the rule loads.

mod behavior;
mod builtin;
mod expression;
mod math;

pub use behavior::{ActorRules, RulesBehavior};
pub use builtin::{
    register_builtins, ChangeVariableParams, ChangeVariableResponse, CreateTrigger, DestroyResponse,
    NoteParams, NoteResponse, RestartSceneResponse, SequenceResponse, SetVariableParams,
    SetVariableResponse, VariableChangesParams, VariableChangesTrigger, VariableComparisonParams,
    VariableMeetsCondition, VariableReachesValueTrigger,
};
pub use expression::{BoxedExpression, DynExpression, Expression, ExpressionRef};
pub use math::register_expressions;

use crate::archive::Reader;
use crate::behavior::BehaviorType;
use crate::error::{Error, Result};
use crate::identity::{ActorId, BehaviorId};
use crate::props::{PropertyDescriptor, Props};
use crate::scene::Scene;
use crate::value::ExpressionValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// A named event a rule can react to
///
/// Implementors are usually unit structs; the per-rule data lives in
/// `Params`.
pub trait Trigger: 'static {
    const NAME: &'static str;
    type Owner: BehaviorType;
    type Params: Props;
}

/// Shared shape of conditions and responses
pub trait RuleElement: Sized + 'static {
    const NAME: &'static str;
    type Owner: BehaviorType;
    type Params: Props;

    fn from_params(params: Self::Params) -> Self;

    /// Build from an element object. Composite elements override this to
    /// load their nested elements through `cx`.
    fn load(reader: &Reader<'_>, cx: &LoadCx<'_>) -> Self {
        Self::from_params(read_params(reader, cx))
    }
}

/// A predicate evaluated when a rule's trigger fires
pub trait Condition: RuleElement {
    fn eval(&self, ctx: &mut RuleContext<'_>) -> bool;
}

/// The action a rule performs
pub trait Response: RuleElement {
    fn run(&self, ctx: &mut RuleContext<'_>);
}

/// Object-safe view of a [`Condition`]
pub trait DynCondition {
    fn element_name(&self) -> &'static str;
    fn evaluate(&self, ctx: &mut RuleContext<'_>) -> bool;
}

impl<C: Condition> DynCondition for C {
    fn element_name(&self) -> &'static str {
        C::NAME
    }

    fn evaluate(&self, ctx: &mut RuleContext<'_>) -> bool {
        self.eval(ctx)
    }
}

/// Object-safe view of a [`Response`]
pub trait DynResponse {
    fn element_name(&self) -> &'static str;
    fn execute(&self, ctx: &mut RuleContext<'_>);
}

impl<R: Response> DynResponse for R {
    fn element_name(&self) -> &'static str {
        R::NAME
    }

    fn execute(&self, ctx: &mut RuleContext<'_>) {
        self.run(ctx);
    }
}

pub type BoxedCondition = Box<dyn DynCondition>;
pub type BoxedResponse = Box<dyn DynResponse>;

/// Read the `params` object of an element, defaulting missing fields, and
/// build any expressions it holds
pub fn read_params<P: Props>(reader: &Reader<'_>, cx: &LoadCx<'_>) -> P {
    let mut params = P::default();
    reader.obj("params", |r| params.read(r));
    params.resolve(cx);
    params
}

/// Comparison names accepted by numeric comparison params
pub const COMPARISONS: &[&str] = &[
    "equal",
    "not equal",
    "less than",
    "less than or equal",
    "greater than",
    "greater than or equal",
];

/// Apply a named comparison. Unknown names compare as `false`.
pub fn compare(comparison: &str, lhs: f64, rhs: f64) -> bool {
    match comparison {
        "equal" => lhs == rhs,
        "not equal" => lhs != rhs,
        "less than" => lhs < rhs,
        "less than or equal" => lhs <= rhs,
        "greater than" => lhs > rhs,
        "greater than or equal" => lhs >= rhs,
        _ => false,
    }
}

/// Data accompanying a trigger firing
#[derive(Debug, Clone, Default)]
pub struct RuleExtras {
    /// The other actor involved (collision partner, tapper...)
    pub other_actor: Option<ActorId>,
    pub values: IndexMap<String, ExpressionValue>,
}

impl RuleExtras {
    pub fn with_other_actor(mut self, actor: ActorId) -> Self {
        self.other_actor = Some(actor);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<ExpressionValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn value(&self, name: &str) -> Option<&ExpressionValue> {
        self.values.get(name)
    }
}

/// Scene access for conditions and responses
pub struct RuleContext<'a> {
    pub scene: &'a mut Scene,
    /// The actor whose rule is running
    pub actor: ActorId,
    pub extras: RuleExtras,
}

impl<'a> RuleContext<'a> {
    pub fn new(scene: &'a mut Scene, actor: ActorId, extras: RuleExtras) -> Self {
        Self { scene, actor, extras }
    }

    pub fn behavior<B: BehaviorType>(&self) -> Option<&B> {
        self.scene.behavior::<B>()
    }

    pub fn behavior_mut<B: BehaviorType>(&mut self) -> Option<&mut B> {
        self.scene.behavior_mut::<B>()
    }
}

/// Kinds of rule element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleElementKind {
    Trigger,
    Condition,
    Response,
    Expression,
}

impl RuleElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleElementKind::Trigger => "trigger",
            RuleElementKind::Condition => "condition",
            RuleElementKind::Response => "response",
            RuleElementKind::Expression => "expression",
        }
    }
}

impl fmt::Display for RuleElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type TriggerLoadFn = fn(&Reader<'_>, &LoadCx<'_>) -> Box<dyn Any>;
type ConditionLoadFn = fn(&Reader<'_>, &LoadCx<'_>) -> BoxedCondition;
type ResponseLoadFn = fn(&Reader<'_>, &LoadCx<'_>) -> BoxedResponse;
type ExpressionLoadFn = fn(&Reader<'_>, &LoadCx<'_>) -> BoxedExpression;

#[derive(Clone, Copy)]
struct ElementEntry<L> {
    type_id: TypeId,
    name: &'static str,
    behavior_id: BehaviorId,
    behavior_name: &'static str,
    params: fn() -> &'static [PropertyDescriptor],
    load: L,
}

type ElementTable<L> = IndexMap<(BehaviorId, &'static str), ElementEntry<L>>;

fn load_trigger_params<T: Trigger>(reader: &Reader<'_>, cx: &LoadCx<'_>) -> Box<dyn Any> {
    Box::new(read_params::<T::Params>(reader, cx))
}

fn load_condition<C: Condition>(reader: &Reader<'_>, cx: &LoadCx<'_>) -> BoxedCondition {
    Box::new(C::load(reader, cx))
}

fn load_response<R: Response>(reader: &Reader<'_>, cx: &LoadCx<'_>) -> BoxedResponse {
    Box::new(R::load(reader, cx))
}

fn load_expression<E: Expression>(reader: &Reader<'_>, cx: &LoadCx<'_>) -> BoxedExpression {
    Rc::new(E::from_params(read_params(reader, cx)))
}

/// Editor-facing description of a registered element
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleElementMeta {
    pub kind: RuleElementKind,
    pub name: &'static str,
    pub behavior_id: BehaviorId,
    pub behavior_name: &'static str,
    pub params: &'static [PropertyDescriptor],
}

/// Catalog of every trigger, condition, response and expression type
#[derive(Default)]
pub struct RuleRegistry {
    triggers: ElementTable<TriggerLoadFn>,
    conditions: ElementTable<ConditionLoadFn>,
    responses: ElementTable<ResponseLoadFn>,
    /// Expressions belong to no behavior and are listed under Rules
    expressions: ElementTable<ExpressionLoadFn>,
    type_ids: HashSet<TypeId>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_trigger<T: Trigger>(&mut self) -> Result<()> {
        let entry = ElementEntry {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
            behavior_id: <T::Owner as BehaviorType>::ID,
            behavior_name: <T::Owner as BehaviorType>::NAME,
            params: <T::Params as Props>::descriptors,
            load: load_trigger_params::<T> as TriggerLoadFn,
        };
        insert_entry(&mut self.triggers, &mut self.type_ids, RuleElementKind::Trigger, entry)
    }

    pub fn register_condition<C: Condition>(&mut self) -> Result<()> {
        let entry = ElementEntry {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
            behavior_id: <C::Owner as BehaviorType>::ID,
            behavior_name: <C::Owner as BehaviorType>::NAME,
            params: <C::Params as Props>::descriptors,
            load: load_condition::<C> as ConditionLoadFn,
        };
        insert_entry(&mut self.conditions, &mut self.type_ids, RuleElementKind::Condition, entry)
    }

    pub fn register_response<R: Response>(&mut self) -> Result<()> {
        let entry = ElementEntry {
            type_id: TypeId::of::<R>(),
            name: R::NAME,
            behavior_id: <R::Owner as BehaviorType>::ID,
            behavior_name: <R::Owner as BehaviorType>::NAME,
            params: <R::Params as Props>::descriptors,
            load: load_response::<R> as ResponseLoadFn,
        };
        insert_entry(&mut self.responses, &mut self.type_ids, RuleElementKind::Response, entry)
    }

    pub fn register_expression<E: Expression>(&mut self) -> Result<()> {
        let entry = ElementEntry {
            type_id: TypeId::of::<E>(),
            name: E::NAME,
            behavior_id: RulesBehavior::ID,
            behavior_name: RulesBehavior::NAME,
            params: <E::Params as Props>::descriptors,
            load: load_expression::<E> as ExpressionLoadFn,
        };
        insert_entry(&mut self.expressions, &mut self.type_ids, RuleElementKind::Expression, entry)
    }

    pub fn len(&self) -> usize {
        self.triggers.len() + self.conditions.len() + self.responses.len() + self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_trigger(&self, behavior: BehaviorId, name: &str) -> bool {
        self.triggers.keys().any(|(b, n)| *b == behavior && *n == name)
    }

    pub fn has_expression(&self, name: &str) -> bool {
        self.expressions.values().any(|entry| entry.name == name)
    }

    /// Build an authored `{"expressionType", "params"}` object
    pub fn load_expression(&self, reader: &Reader<'_>) -> Option<BoxedExpression> {
        LoadCx { registry: self }.load_expression(reader)
    }

    /// Every registered element, triggers first and expressions last, in
    /// registration order
    pub fn metadata(&self) -> Vec<RuleElementMeta> {
        fn describe<L>(kind: RuleElementKind, table: &ElementTable<L>) -> impl Iterator<Item = RuleElementMeta> + '_ {
            table.values().map(move |entry| RuleElementMeta {
                kind,
                name: entry.name,
                behavior_id: entry.behavior_id,
                behavior_name: entry.behavior_name,
                params: (entry.params)(),
            })
        }
        describe(RuleElementKind::Trigger, &self.triggers)
            .chain(describe(RuleElementKind::Condition, &self.conditions))
            .chain(describe(RuleElementKind::Response, &self.responses))
            .chain(describe(RuleElementKind::Expression, &self.expressions))
            .collect()
    }

    /// Load one rule object
    ///
    /// Returns `None` (with a warning) if the trigger, the response or any
    /// condition cannot be resolved.
    pub fn load_rule(&self, reader: &Reader<'_>) -> Option<Rule> {
        let cx = LoadCx { registry: self };

        let Some((trigger, trigger_name, trigger_params)) =
            reader.obj("trigger", |r| self.load_trigger(r, &cx)).flatten()
        else {
            tracing::warn!("rule skipped: missing or unknown trigger");
            return None;
        };

        let Some(response) = reader.obj("response", |r| cx.load_response(r)).flatten() else {
            tracing::warn!(trigger = trigger_name, "rule skipped: missing or unknown response");
            return None;
        };

        let mut conditions = Vec::new();
        let mut complete = true;
        reader.each("conditions", |r| match cx.load_condition(r) {
            Some(condition) => conditions.push(condition),
            None => complete = false,
        });
        if !complete {
            tracing::warn!(trigger = trigger_name, "rule skipped: unknown condition");
            return None;
        }

        Some(Rule {
            trigger,
            trigger_name,
            trigger_params,
            conditions,
            response,
        })
    }

    fn load_trigger(&self, reader: &Reader<'_>, cx: &LoadCx<'_>) -> Option<(TypeId, &'static str, Box<dyn Any>)> {
        let entry = find_entry(&self.triggers, RuleElementKind::Trigger, reader)?;
        Some((entry.type_id, entry.name, (entry.load)(reader, cx)))
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("triggers", &self.triggers.len())
            .field("conditions", &self.conditions.len())
            .field("responses", &self.responses.len())
            .field("expressions", &self.expressions.len())
            .finish()
    }
}

fn insert_entry<L>(
    table: &mut ElementTable<L>,
    type_ids: &mut HashSet<TypeId>,
    kind: RuleElementKind,
    entry: ElementEntry<L>,
) -> Result<()> {
    let key = (entry.behavior_id, entry.name);
    if table.contains_key(&key) || !type_ids.insert(entry.type_id) {
        return Err(Error::DuplicateRuleElement {
            kind: kind.as_str(),
            name: entry.name.to_string(),
        });
    }
    table.insert(key, entry);
    Ok(())
}

/// Resolve `{"name", "behaviorId"}` against a table
fn find_entry<'t, L>(table: &'t ElementTable<L>, kind: RuleElementKind, reader: &Reader<'_>) -> Option<&'t ElementEntry<L>> {
    let Some(name) = reader.str("name") else {
        tracing::warn!(%kind, "rule element without name");
        return None;
    };
    let Some(behavior_id) = reader.int("behaviorId") else {
        return table.values().find(|entry| entry.name == name);
    };
    let found = u32::try_from(behavior_id).ok().and_then(|id| {
        table
            .values()
            .find(|entry| entry.behavior_id == BehaviorId::new(id) && entry.name == name)
    });
    if found.is_none() {
        match table.values().find(|entry| entry.name == name) {
            Some(entry) => tracing::warn!(
                %kind,
                name,
                behavior_id,
                owner = entry.behavior_name,
                "rule element attached to the wrong behavior"
            ),
            None => tracing::warn!(%kind, name, behavior_id, "unknown rule element"),
        }
    }
    found
}

/// Context for loading nested rule elements
#[derive(Debug, Clone, Copy)]
pub struct LoadCx<'a> {
    pub registry: &'a RuleRegistry,
}

impl<'a> LoadCx<'a> {
    pub fn load_condition(&self, reader: &Reader<'_>) -> Option<BoxedCondition> {
        let entry = find_entry(&self.registry.conditions, RuleElementKind::Condition, reader)?;
        Some((entry.load)(reader, self))
    }

    pub fn load_response(&self, reader: &Reader<'_>) -> Option<BoxedResponse> {
        let entry = find_entry(&self.registry.responses, RuleElementKind::Response, reader)?;
        Some((entry.load)(reader, self))
    }

    /// Resolve `{"expressionType", "params"}` by expression name
    pub fn load_expression(&self, reader: &Reader<'_>) -> Option<BoxedExpression> {
        let Some(name) = reader.str("expressionType") else {
            tracing::warn!("expression without expressionType");
            return None;
        };
        let Some(entry) = self.registry.expressions.values().find(|entry| entry.name == name) else {
            tracing::warn!(name, "unknown expression");
            return None;
        };
        Some((entry.load)(reader, self))
    }
}

/// A loaded rule. Immutable once built.
pub struct Rule {
    trigger: TypeId,
    trigger_name: &'static str,
    trigger_params: Box<dyn Any>,
    conditions: Vec<BoxedCondition>,
    response: BoxedResponse,
}

impl Rule {
    /// Build a rule in code
    pub fn new<T: Trigger>(params: T::Params, response: impl Response) -> Self {
        Self {
            trigger: TypeId::of::<T>(),
            trigger_name: T::NAME,
            trigger_params: Box::new(params),
            conditions: Vec::new(),
            response: Box::new(response),
        }
    }

    pub fn with_condition(mut self, condition: impl Condition) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    pub fn is_triggered_by<T: Trigger>(&self) -> bool {
        self.trigger == TypeId::of::<T>()
    }

    /// The trigger params, if the rule is triggered by `T`
    pub fn trigger_params<T: Trigger>(&self) -> Option<&T::Params> {
        if !self.is_triggered_by::<T>() {
            return None;
        }
        self.trigger_params.downcast_ref::<T::Params>()
    }

    pub fn trigger_name(&self) -> &'static str {
        self.trigger_name
    }

    pub fn response_name(&self) -> &'static str {
        self.response.element_name()
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Whether every condition holds. Stops at the first failing one.
    pub fn conditions_hold(&self, ctx: &mut RuleContext<'_>) -> bool {
        self.conditions.iter().all(|condition| condition.evaluate(ctx))
    }

    pub fn run_response(&self, ctx: &mut RuleContext<'_>) {
        self.response.execute(ctx);
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditions: Vec<_> = self.conditions.iter().map(|c| c.element_name()).collect();
        f.debug_struct("Rule")
            .field("trigger", &self.trigger_name)
            .field("conditions", &conditions)
            .field("response", &self.response.element_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare() {
        assert!(compare("equal", 2.0, 2.0));
        assert!(compare("not equal", 1.0, 2.0));
        assert!(compare("less than or equal", 2.0, 2.0));
        assert!(compare("greater than", 3.0, 2.0));
        assert!(!compare("sideways", 1.0, 1.0));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = RuleRegistry::new();
        registry.register_trigger::<CreateTrigger>().unwrap();
        let err = registry.register_trigger::<CreateTrigger>().unwrap_err();
        assert!(matches!(err, Error::DuplicateRuleElement { kind: "trigger", .. }));
    }

    #[test]
    fn test_load_rule_resolves_elements() {
        let mut registry = RuleRegistry::new();
        registry.register_trigger::<CreateTrigger>().unwrap();
        registry.register_response::<NoteResponse>().unwrap();
        registry.register_condition::<VariableMeetsCondition>().unwrap();

        let doc = json!({
            "trigger": { "name": "create", "behaviorId": 16 },
            "conditions": [{
                "name": "variable meets condition",
                "behaviorId": 16,
                "params": { "variable": "v1", "comparison": "greater than", "value": 2 }
            }],
            "response": { "name": "note", "behaviorId": 16, "params": { "note": "hello" } }
        });
        let rule = registry.load_rule(&Reader::new(&doc)).unwrap();
        assert!(rule.is_triggered_by::<CreateTrigger>());
        assert!(!rule.is_triggered_by::<VariableChangesTrigger>());
        assert!(rule.trigger_params::<CreateTrigger>().is_some());
        assert_eq!(rule.condition_count(), 1);
        assert_eq!(rule.response_name(), "note");
    }

    #[test]
    fn test_load_rule_skips_unknown_elements() {
        let mut registry = RuleRegistry::new();
        registry.register_trigger::<CreateTrigger>().unwrap();
        registry.register_response::<NoteResponse>().unwrap();

        let unknown_trigger = json!({
            "trigger": { "name": "explode", "behaviorId": 16 },
            "response": { "name": "note", "behaviorId": 16 }
        });
        assert!(registry.load_rule(&Reader::new(&unknown_trigger)).is_none());

        let wrong_owner = json!({
            "trigger": { "name": "create", "behaviorId": 17 },
            "response": { "name": "note", "behaviorId": 16 }
        });
        assert!(registry.load_rule(&Reader::new(&wrong_owner)).is_none());

        let unknown_condition = json!({
            "trigger": { "name": "create", "behaviorId": 16 },
            "conditions": [{ "name": "is raining", "behaviorId": 16 }],
            "response": { "name": "note", "behaviorId": 16 }
        });
        assert!(registry.load_rule(&Reader::new(&unknown_condition)).is_none());

        let no_response = json!({ "trigger": { "name": "create", "behaviorId": 16 } });
        assert!(registry.load_rule(&Reader::new(&no_response)).is_none());
    }

    #[test]
    fn test_trigger_params_are_read() {
        let mut registry = RuleRegistry::new();
        registry.register_trigger::<VariableChangesTrigger>().unwrap();
        registry.register_response::<NoteResponse>().unwrap();

        let doc = json!({
            "trigger": { "name": "variable changes", "params": { "variable": "score" } },
            "response": { "name": "note" }
        });
        let rule = registry.load_rule(&Reader::new(&doc)).unwrap();
        let params = rule.trigger_params::<VariableChangesTrigger>().unwrap();
        assert_eq!(params.variable.id(), "score");
        assert!(rule.trigger_params::<CreateTrigger>().is_none());
    }

    #[test]
    fn test_metadata_export() {
        let mut registry = RuleRegistry::new();
        registry.register_trigger::<CreateTrigger>().unwrap();
        registry.register_response::<SetVariableResponse>().unwrap();

        let meta = registry.metadata();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].kind, RuleElementKind::Trigger);
        assert_eq!(meta[1].name, "set variable");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json[1]["behaviorName"], "Rules");
        assert_eq!(json[1]["params"][0]["name"], "variable");
    }

    #[test]
    fn test_behavior_id_must_name_owner() {
        let mut registry = RuleRegistry::new();
        registry.register_trigger::<CreateTrigger>().unwrap();
        registry.register_response::<NoteResponse>().unwrap();

        let negative = json!({
            "trigger": { "name": "create", "behaviorId": -16 },
            "response": { "name": "note", "behaviorId": 16 }
        });
        assert!(registry.load_rule(&Reader::new(&negative)).is_none());

        let explicit = json!({
            "trigger": { "name": "create", "behaviorId": 16 },
            "response": { "name": "note", "behaviorId": 16 }
        });
        assert_eq!(registry.load_rule(&Reader::new(&explicit)).unwrap().trigger_name(), "create");
    }

    #[test]
    fn test_expressions_are_registered_and_listed() {
        let mut registry = RuleRegistry::new();
        register_expressions(&mut registry).unwrap();
        let err = registry.register_expression::<math::AddExpression>().unwrap_err();
        assert!(matches!(err, Error::DuplicateRuleElement { kind: "expression", .. }));

        let sum = registry.metadata().into_iter().find(|meta| meta.name == "+").unwrap();
        assert_eq!(sum.kind, RuleElementKind::Expression);
        assert_eq!(sum.behavior_id, RulesBehavior::ID);
        assert_eq!(sum.params[0].kind, crate::props::PropKind::Expression);

        let doc = json!({ "expressionType": "max", "params": { "lhs": 3 } });
        let max = registry.load_expression(&Reader::new(&doc)).unwrap();
        assert_eq!(max.expression_name(), "max");
    }

    #[test]
    fn test_extras() {
        let extras = RuleExtras::default()
            .with_other_actor(ActorId::new(4))
            .with_value("speed", 3.0);
        assert_eq!(extras.other_actor, Some(ActorId::new(4)));
        assert_eq!(extras.value("speed"), Some(&ExpressionValue::from(3.0)));
    }
}
