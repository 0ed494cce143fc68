//! Expressions: numeric params computed when a rule runs

use super::{LoadCx, RuleContext};
use crate::archive::{Reader, Writer};
use crate::props::{PropKind, PropValue, Props};
use crate::value::ExpressionValue;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// A registered expression type
///
/// Expressions have no owning behavior. Their params are usually
/// [`ExpressionRef`]s themselves, which is how trees nest.
pub trait Expression: Sized + 'static {
    const NAME: &'static str;
    type Params: Props;

    fn from_params(params: Self::Params) -> Self;

    fn eval(&self, ctx: &mut RuleContext<'_>) -> ExpressionValue;
}

/// Object-safe view of an [`Expression`]
pub trait DynExpression {
    fn expression_name(&self) -> &'static str;
    fn evaluate(&self, ctx: &mut RuleContext<'_>) -> ExpressionValue;
}

impl<E: Expression> DynExpression for E {
    fn expression_name(&self) -> &'static str {
        E::NAME
    }

    fn evaluate(&self, ctx: &mut RuleContext<'_>) -> ExpressionValue {
        self.eval(ctx)
    }
}

pub type BoxedExpression = Rc<dyn DynExpression>;

#[derive(Debug, Clone, PartialEq)]
enum ExpressionSource {
    Literal(ExpressionValue),
    /// The authored `{"expressionType", "params"}` object, written back as is
    Authored(Rc<Value>),
}

/// A param value that is either a literal or an expression tree
///
/// Authored trees are built when the owning rule element loads. Equality
/// compares the authored form.
#[derive(Clone)]
pub struct ExpressionRef {
    source: ExpressionSource,
    compiled: Option<BoxedExpression>,
}

impl ExpressionRef {
    pub fn literal(value: impl Into<ExpressionValue>) -> Self {
        Self {
            source: ExpressionSource::Literal(value.into()),
            compiled: None,
        }
    }

    /// An authored expression object, built later by [`PropValue::resolve`]
    pub fn authored(doc: Value) -> Self {
        Self {
            source: ExpressionSource::Authored(Rc::new(doc)),
            compiled: None,
        }
    }

    pub fn as_literal(&self) -> Option<&ExpressionValue> {
        match &self.source {
            ExpressionSource::Literal(value) => Some(value),
            ExpressionSource::Authored(_) => None,
        }
    }

    /// Name of the built expression, `None` for literals and unresolved trees
    pub fn expression_name(&self) -> Option<&'static str> {
        self.compiled.as_ref().map(|expression| expression.expression_name())
    }

    /// Current value. An authored tree that names an unknown expression
    /// evaluates to 0.
    pub fn eval(&self, ctx: &mut RuleContext<'_>) -> ExpressionValue {
        let doc = match &self.source {
            ExpressionSource::Literal(value) => return value.clone(),
            ExpressionSource::Authored(doc) => doc,
        };
        if let Some(expression) = &self.compiled {
            return expression.evaluate(ctx);
        }
        // Read outside rule loading, so build it on the spot
        let built = ctx.scene.types().rules().load_expression(&Reader::new(doc));
        built.map_or_else(ExpressionValue::default, |expression| expression.evaluate(ctx))
    }

    /// Current value as a number, 0 for strings
    pub fn eval_number(&self, ctx: &mut RuleContext<'_>) -> f64 {
        self.eval(ctx).number_or(0.0)
    }
}

impl Default for ExpressionRef {
    fn default() -> Self {
        Self::literal(0.0)
    }
}

impl From<f64> for ExpressionRef {
    fn from(value: f64) -> Self {
        Self::literal(value)
    }
}

impl From<ExpressionValue> for ExpressionRef {
    fn from(value: ExpressionValue) -> Self {
        Self::literal(value)
    }
}

impl PartialEq for ExpressionRef {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for ExpressionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ExpressionSource::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ExpressionSource::Authored(doc) => f
                .debug_struct("Authored")
                .field("doc", doc)
                .field("compiled", &self.expression_name())
                .finish(),
        }
    }
}

impl PropValue for ExpressionRef {
    const KIND: PropKind = PropKind::Expression;

    /// Literals only; an expression tree has no value until it runs
    fn to_expression(&self) -> ExpressionValue {
        self.as_literal().cloned().unwrap_or_default()
    }

    fn from_expression(value: &ExpressionValue) -> Option<Self> {
        Some(Self::literal(value.clone()))
    }

    fn read_from(reader: &Reader<'_>, key: &str) -> Option<Self> {
        match reader.find(key)? {
            Value::Object(map) if map.contains_key("expressionType") => {
                Some(Self::authored(Value::Object(map.clone())))
            }
            Value::Object(_) => None,
            _ => reader.expression(key).map(Self::literal),
        }
    }

    fn write_to(&self, writer: &mut Writer, key: &str) {
        match &self.source {
            ExpressionSource::Literal(value) => writer.expression(key, value),
            ExpressionSource::Authored(doc) => writer.value(key, doc.as_ref().clone()),
        }
    }

    fn resolve(&mut self, cx: &LoadCx<'_>) {
        if let ExpressionSource::Authored(doc) = &self.source {
            self.compiled = cx.load_expression(&Reader::new(doc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{register_builtins, RuleExtras};
    use crate::{ActorDesc, Scene, SceneConfig, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;

    crate::props! {
        struct AmountParams {
            amount: ExpressionRef = ExpressionRef::from(2.0),
        }
    }

    fn scene() -> Scene {
        let mut types = TypeRegistry::new();
        register_builtins(&mut types).unwrap();
        Scene::new(Arc::new(types), SceneConfig::default())
    }

    fn read(doc: Value) -> AmountParams {
        let mut params = AmountParams::default();
        params.read(&Reader::new(&doc));
        params
    }

    #[test]
    fn test_literals_and_defaults() {
        let mut scene = scene();
        let actor = scene.add_actor(ActorDesc::new());
        let mut ctx = RuleContext::new(&mut scene, actor, RuleExtras::default());

        assert_eq!(AmountParams::default().amount.eval_number(&mut ctx), 2.0);
        assert_eq!(read(json!({ "amount": 7 })).amount.eval_number(&mut ctx), 7.0);
        assert_eq!(read(json!({ "amount": "hi" })).amount.eval(&mut ctx), ExpressionValue::from("hi"));
        assert_eq!(read(json!({ "amount": { "x": 1 } })).amount, ExpressionRef::from(2.0));
        assert_eq!(AmountParams::descriptors()[0].kind, PropKind::Expression);
        assert_eq!(AmountParams::descriptors()[0].default, ExpressionValue::from(2.0));
    }

    #[test]
    fn test_resolve_builds_nested_tree() {
        let mut scene = scene();
        let actor = scene.add_actor(ActorDesc::new());
        let doc = json!({ "amount": {
            "expressionType": "+",
            "params": { "lhs": 1, "rhs": { "expressionType": "*", "params": { "lhs": 3, "rhs": 4 } } }
        } });

        let mut params = read(doc.clone());
        params.resolve(&LoadCx { registry: scene.types().rules() });
        assert_eq!(params.amount.expression_name(), Some("+"));

        let mut ctx = RuleContext::new(&mut scene, actor, RuleExtras::default());
        assert_eq!(params.amount.eval_number(&mut ctx), 13.0);

        let mut writer = Writer::new();
        params.write(&mut writer);
        assert_eq!(writer.into_value(), doc);
    }

    #[test]
    fn test_unresolved_and_unknown_trees() {
        let mut scene = scene();
        let actor = scene.add_actor(ActorDesc::new());

        let unresolved = read(json!({ "amount": { "expressionType": "-", "params": { "lhs": 5, "rhs": 2 } } }));
        assert_eq!(unresolved.amount.expression_name(), None);

        let mut unknown = read(json!({ "amount": { "expressionType": "teleport", "params": {} } }));
        unknown.resolve(&LoadCx { registry: scene.types().rules() });
        assert_eq!(unknown.amount.expression_name(), None);

        let mut ctx = RuleContext::new(&mut scene, actor, RuleExtras::default());
        assert_eq!(unresolved.amount.eval_number(&mut ctx), 3.0);
        assert_eq!(unknown.amount.eval(&mut ctx), ExpressionValue::from(0.0));
    }
}
