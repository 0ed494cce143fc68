//! Built-in math and random expressions
//!
//! All of them compute on numbers. A param that evaluates to a string
//! counts as 0.

use super::expression::{Expression, ExpressionRef};
use super::{RuleContext, RuleRegistry};
use crate::error::Result;
use crate::props::PropAttribs;
use crate::value::ExpressionValue;

/// Declare an expression whose params struct is already defined
macro_rules! expression {
    (
        $(#[$meta:meta])*
        $ty:ident($params:ident) = $name:literal, |$p:ident, $ctx:ident| $body:expr
    ) => {
        $(#[$meta])*
        pub struct $ty {
            params: $params,
        }

        impl Expression for $ty {
            const NAME: &'static str = $name;
            type Params = $params;

            fn from_params(params: $params) -> Self {
                Self { params }
            }

            fn eval(&self, $ctx: &mut RuleContext<'_>) -> ExpressionValue {
                let $p = &self.params;
                ExpressionValue::Number($body)
            }
        }
    };
}

crate::props! {
    pub struct NumberParams {
        value: f64 = 0.0,
    }
}

crate::props! {
    /// Operands of `+` and `-`
    pub struct SumParams {
        lhs: ExpressionRef = ExpressionRef::from(0.0),
        rhs: ExpressionRef = ExpressionRef::from(0.0),
    }
}

crate::props! {
    /// Operands of `*`, `/`, `%` and `^`
    pub struct ProductParams {
        lhs: ExpressionRef = ExpressionRef::from(1.0),
        rhs: ExpressionRef = ExpressionRef::from(1.0),
    }
}

crate::props! {
    pub struct LogParams {
        base: ExpressionRef = ExpressionRef::from(2.0),
        number: ExpressionRef = ExpressionRef::from(1.0),
    }
}

crate::props! {
    pub struct UnaryParams {
        number: ExpressionRef = ExpressionRef::from(0.0),
    }
}

crate::props! {
    pub struct MixParams {
        lhs: ExpressionRef = ExpressionRef::from(0.0),
        rhs: ExpressionRef = ExpressionRef::from(1.0),
        mix: ExpressionRef = ExpressionRef::from(0.5),
    }
}

crate::props! {
    pub struct ClampParams {
        number: ExpressionRef = ExpressionRef::from(0.0),
        min: ExpressionRef = ExpressionRef::from(0.0),
        max: ExpressionRef = ExpressionRef::from(1.0),
    }
}

crate::props! {
    /// Operands of `min`, `max` and `choose`
    pub struct PairParams {
        lhs: ExpressionRef = ExpressionRef::from(0.0),
        rhs: ExpressionRef = ExpressionRef::from(1.0),
    }
}

crate::props! {
    pub struct RandomParams {
        min: ExpressionRef = ExpressionRef::from(0.0),
        max: ExpressionRef = ExpressionRef::from(1.0),
        /// Whole numbers in `[min, max]` instead of reals in `[min, max)`
        discrete: bool = false => PropAttribs::new().label("whole numbers"),
    }
}

crate::props! {
    pub struct GaussParams {
        mean: ExpressionRef = ExpressionRef::from(0.0),
        sigma: ExpressionRef = ExpressionRef::from(0.0),
    }
}

crate::props! {
    pub struct WeightedChooseParams {
        lhs: ExpressionRef = ExpressionRef::from(0.0),
        rhs: ExpressionRef = ExpressionRef::from(1.0),
        lhw: ExpressionRef = ExpressionRef::from(0.5) => PropAttribs::new().label("left weight"),
        rhw: ExpressionRef = ExpressionRef::from(0.5) => PropAttribs::new().label("right weight"),
    }
}

expression! {
    /// A literal number
    NumberExpression(NumberParams) = "number", |p, _ctx| p.value
}

expression! {
    AddExpression(SumParams) = "+", |p, ctx| p.lhs.eval_number(ctx) + p.rhs.eval_number(ctx)
}

expression! {
    SubtractExpression(SumParams) = "-", |p, ctx| p.lhs.eval_number(ctx) - p.rhs.eval_number(ctx)
}

expression! {
    MultiplyExpression(ProductParams) = "*", |p, ctx| p.lhs.eval_number(ctx) * p.rhs.eval_number(ctx)
}

expression! {
    /// Division, 0 for a zero divisor
    DivideExpression(ProductParams) = "/", |p, ctx| {
        let lhs = p.lhs.eval_number(ctx);
        let rhs = p.rhs.eval_number(ctx);
        if rhs == 0.0 { 0.0 } else { lhs / rhs }
    }
}

expression! {
    /// Floored modulo: the result takes the divisor's sign. 0 for a zero
    /// divisor.
    ModExpression(ProductParams) = "%", |p, ctx| {
        let lhs = p.lhs.eval_number(ctx);
        let rhs = p.rhs.eval_number(ctx);
        if rhs == 0.0 { 0.0 } else { lhs - (lhs / rhs).floor() * rhs }
    }
}

expression! {
    PowExpression(ProductParams) = "^", |p, ctx| p.lhs.eval_number(ctx).powf(p.rhs.eval_number(ctx))
}

expression! {
    /// Logarithm in any base, 0 for base 1
    LogExpression(LogParams) = "log", |p, ctx| {
        let base = p.base.eval_number(ctx).ln();
        let number = p.number.eval_number(ctx).ln();
        if base == 0.0 { 0.0 } else { number / base }
    }
}

expression! {
    AbsExpression(UnaryParams) = "abs", |p, ctx| p.number.eval_number(ctx).abs()
}

expression! {
    FloorExpression(UnaryParams) = "floor", |p, ctx| p.number.eval_number(ctx).floor()
}

expression! {
    /// Linear blend, `lhs` at mix 0 and `rhs` at mix 1
    MixExpression(MixParams) = "mix", |p, ctx| {
        let lhs = p.lhs.eval_number(ctx);
        let rhs = p.rhs.eval_number(ctx);
        let mix = p.mix.eval_number(ctx);
        (1.0 - mix) * lhs + mix * rhs
    }
}

expression! {
    /// Bounds may come in either order
    ClampExpression(ClampParams) = "clamp", |p, ctx| {
        let number = p.number.eval_number(ctx);
        let min = p.min.eval_number(ctx);
        let max = p.max.eval_number(ctx);
        number.max(min.min(max)).min(min.max(max))
    }
}

expression! {
    /// Sine of an angle in radians
    SinExpression(UnaryParams) = "sin", |p, ctx| p.number.eval_number(ctx).sin()
}

expression! {
    /// Degrees to radians
    RadExpression(UnaryParams) = "rad", |p, ctx| std::f64::consts::PI * p.number.eval_number(ctx) / 180.0
}

expression! {
    MinExpression(PairParams) = "min", |p, ctx| p.lhs.eval_number(ctx).min(p.rhs.eval_number(ctx))
}

expression! {
    MaxExpression(PairParams) = "max", |p, ctx| p.lhs.eval_number(ctx).max(p.rhs.eval_number(ctx))
}

expression! {
    /// Uniform draw from the scene's random source
    RandomExpression(RandomParams) = "random", |p, ctx| {
        let min = p.min.eval_number(ctx);
        let max = p.max.eval_number(ctx);
        let rng = ctx.scene.rng_mut();
        if p.discrete {
            rng.range_f64(min, max + 1.0).floor()
        } else {
            rng.range_f64(min, max)
        }
    }
}

expression! {
    /// Normal draw with the given mean and deviation
    GaussExpression(GaussParams) = "gauss", |p, ctx| {
        let mean = p.mean.eval_number(ctx);
        let sigma = p.sigma.eval_number(ctx);
        mean + ctx.scene.rng_mut().normal() * sigma
    }
}

expression! {
    /// Either operand with even odds
    ChooseExpression(PairParams) = "choose", |p, ctx| {
        let lhs = p.lhs.eval_number(ctx);
        let rhs = p.rhs.eval_number(ctx);
        if ctx.scene.rng_mut().chance(0.5) { lhs } else { rhs }
    }
}

expression! {
    /// Either operand, odds set by the weights. A non-positive weight never
    /// wins.
    WeightedChooseExpression(WeightedChooseParams) = "weighted choose", |p, ctx| {
        let lhs = p.lhs.eval_number(ctx);
        let rhs = p.rhs.eval_number(ctx);
        let lhw = p.lhw.eval_number(ctx);
        let rhw = p.rhw.eval_number(ctx);
        if lhw <= 0.0 {
            rhs
        } else if rhw <= 0.0 {
            lhs
        } else if ctx.scene.rng_mut().chance(lhw / (lhw + rhw)) {
            lhs
        } else {
            rhs
        }
    }
}

/// Register every built-in expression
pub fn register_expressions(rules: &mut RuleRegistry) -> Result<()> {
    rules.register_expression::<NumberExpression>()?;
    rules.register_expression::<AddExpression>()?;
    rules.register_expression::<SubtractExpression>()?;
    rules.register_expression::<MultiplyExpression>()?;
    rules.register_expression::<DivideExpression>()?;
    rules.register_expression::<ModExpression>()?;
    rules.register_expression::<PowExpression>()?;
    rules.register_expression::<LogExpression>()?;
    rules.register_expression::<AbsExpression>()?;
    rules.register_expression::<FloorExpression>()?;
    rules.register_expression::<MixExpression>()?;
    rules.register_expression::<ClampExpression>()?;
    rules.register_expression::<SinExpression>()?;
    rules.register_expression::<RadExpression>()?;
    rules.register_expression::<MinExpression>()?;
    rules.register_expression::<MaxExpression>()?;
    rules.register_expression::<RandomExpression>()?;
    rules.register_expression::<GaussExpression>()?;
    rules.register_expression::<ChooseExpression>()?;
    rules.register_expression::<WeightedChooseExpression>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Reader;
    use crate::rules::{register_builtins, RuleExtras};
    use crate::{ActorDesc, Scene, SceneConfig, TypeRegistry};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn scene() -> Scene {
        let mut types = TypeRegistry::new();
        register_builtins(&mut types).unwrap();
        Scene::new(Arc::new(types), SceneConfig::default().with_rng_seed(7))
    }

    fn eval(scene: &mut Scene, doc: Value) -> f64 {
        let expression = scene.types().rules().load_expression(&Reader::new(&doc)).unwrap();
        let actor = scene.add_actor(ActorDesc::new());
        let mut ctx = RuleContext::new(scene, actor, RuleExtras::default());
        expression.evaluate(&mut ctx).number_or(f64::NAN)
    }

    fn op(name: &str, params: Value) -> Value {
        json!({ "expressionType": name, "params": params })
    }

    #[test]
    fn test_arithmetic() {
        let mut scene = scene();
        assert_eq!(eval(&mut scene, op("number", json!({ "value": 4.5 }))), 4.5);
        assert_eq!(eval(&mut scene, op("+", json!({ "lhs": 2, "rhs": 3 }))), 5.0);
        assert_eq!(eval(&mut scene, op("-", json!({ "lhs": 2 }))), 2.0);
        assert_eq!(eval(&mut scene, op("*", json!({ "lhs": 4 }))), 4.0);
        assert_eq!(eval(&mut scene, op("^", json!({ "lhs": 2, "rhs": 10 }))), 1024.0);
        assert_eq!(eval(&mut scene, op("abs", json!({ "number": -3 }))), 3.0);
        assert_eq!(eval(&mut scene, op("floor", json!({ "number": -1.5 }))), -2.0);
        assert_eq!(eval(&mut scene, op("min", json!({ "lhs": 4, "rhs": -1 }))), -1.0);
        assert_eq!(eval(&mut scene, op("max", json!({ "lhs": 4 }))), 4.0);
        assert_eq!(eval(&mut scene, op("mix", json!({ "lhs": 10, "rhs": 20, "mix": 0.25 }))), 12.5);
        assert!((eval(&mut scene, op("log", json!({ "base": 2, "number": 8 }))) - 3.0).abs() < 1e-12);
        assert!((eval(&mut scene, op("rad", json!({ "number": 90 }))) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(eval(&mut scene, op("sin", json!({}))), 0.0);
    }

    #[test]
    fn test_degenerate_operands() {
        let mut scene = scene();
        assert_eq!(eval(&mut scene, op("/", json!({ "lhs": 3, "rhs": 0 }))), 0.0);
        assert_eq!(eval(&mut scene, op("/", json!({ "lhs": 3, "rhs": 2 }))), 1.5);
        assert_eq!(eval(&mut scene, op("%", json!({ "lhs": 3, "rhs": 0 }))), 0.0);
        assert_eq!(eval(&mut scene, op("%", json!({ "lhs": -1, "rhs": 3 }))), 2.0);
        assert_eq!(eval(&mut scene, op("%", json!({ "lhs": 7, "rhs": -3 }))), -2.0);
        assert_eq!(eval(&mut scene, op("log", json!({ "base": 1, "number": 8 }))), 0.0);
        assert_eq!(eval(&mut scene, op("clamp", json!({ "number": 5, "min": 3, "max": 1 }))), 3.0);
        assert_eq!(eval(&mut scene, op("clamp", json!({ "number": -5 }))), 0.0);
        assert_eq!(eval(&mut scene, op("+", json!({ "lhs": "text", "rhs": 2 }))), 2.0);
    }

    #[test]
    fn test_nested_operands() {
        let mut scene = scene();
        let doc = op("-", json!({
            "lhs": op("*", json!({ "lhs": 6, "rhs": op("+", json!({ "lhs": 1, "rhs": 1 })) })),
            "rhs": op("number", json!({ "value": 2 }))
        }));
        assert_eq!(eval(&mut scene, doc), 10.0);
    }

    #[test]
    fn test_random_bounds() {
        let mut scene = scene();
        for _ in 0..200 {
            let real = eval(&mut scene, op("random", json!({ "min": 2, "max": 4 })));
            assert!((2.0..4.0).contains(&real));

            let whole = eval(&mut scene, op("random", json!({ "min": 1, "max": 3, "discrete": true })));
            assert!([1.0, 2.0, 3.0].contains(&whole));

            let picked = eval(&mut scene, op("choose", json!({ "lhs": 5, "rhs": 6 })));
            assert!(picked == 5.0 || picked == 6.0);
        }
        assert_eq!(eval(&mut scene, op("gauss", json!({ "mean": 3 }))), 3.0);
    }

    #[test]
    fn test_random_replays_for_seed() {
        let doc = op("random", json!({ "min": 0, "max": 100 }));
        let first: Vec<f64> = {
            let mut scene = scene();
            (0..5).map(|_| eval(&mut scene, doc.clone())).collect()
        };
        let mut again = scene();
        let second: Vec<f64> = (0..5).map(|_| eval(&mut again, doc.clone())).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_weighted_choose_zero_weight_never_wins() {
        let mut scene = scene();
        for _ in 0..50 {
            let doc = op("weighted choose", json!({ "lhs": 1, "rhs": 2, "lhw": 0, "rhw": 5 }));
            assert_eq!(eval(&mut scene, doc), 2.0);
            let doc = op("weighted choose", json!({ "lhs": 1, "rhs": 2, "lhw": 3, "rhw": -1 }));
            assert_eq!(eval(&mut scene, doc), 1.0);
        }
    }

    #[test]
    fn test_unknown_expression_type() {
        let scene = scene();
        let rules = scene.types().rules();
        assert!(rules.load_expression(&Reader::new(&op("teleport", json!({})))).is_none());
        assert!(rules.load_expression(&Reader::new(&json!({ "params": {} }))).is_none());
        assert!(rules.has_expression("weighted choose"));
    }
}
