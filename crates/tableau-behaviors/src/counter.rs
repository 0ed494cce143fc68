//! Counter behavior
//!
//! A number per actor kept within `[min_value, max_value]` when changed by
//! rules. Every change fires matching `counter changes` rules.

use tableau_core::rules::{
    compare, Condition, ExpressionRef, Response, RuleContext, RuleElement, RuleExtras, Trigger,
    COMPARISONS,
};
use tableau_core::{
    ActorId, BehaviorId, BehaviorType, ComponentStore, PropAttribs, Result, Scene, TypeRegistry,
};

tableau_core::props! {
    pub struct CounterProps {
        value: f64 = 0.0 => PropAttribs::new().label("value").min(0.0).max(100.0).rules_get().rules_set(),
        min_value: f64 = 0.0 => PropAttribs::new().label("minimum value"),
        max_value: f64 = 100.0 => PropAttribs::new().label("maximum value"),
    }
}

impl CounterProps {
    fn clamp(&self, value: f64) -> f64 {
        let (lo, hi) = if self.min_value <= self.max_value {
            (self.min_value, self.max_value)
        } else {
            (self.max_value, self.min_value)
        };
        value.clamp(lo, hi)
    }
}

#[derive(Debug, Default)]
pub struct CounterBehavior {
    components: ComponentStore<CounterProps>,
}

impl CounterBehavior {
    pub fn value(&self, actor: ActorId) -> Option<f64> {
        self.components.get(actor).map(|c| c.props.value)
    }
}

impl BehaviorType for CounterBehavior {
    type Props = CounterProps;
    type State = ();

    const ID: BehaviorId = BehaviorId::new(21);
    const NAME: &'static str = "Counter";

    fn components(&self) -> &ComponentStore<CounterProps> {
        &self.components
    }

    fn components_mut(&mut self) -> &mut ComponentStore<CounterProps> {
        &mut self.components
    }
}

/// Set the counter, clamped to its bounds, and fire `counter changes` rules
/// if the value changed. Returns the new value.
pub fn set_counter(scene: &mut Scene, actor: ActorId, value: f64) -> Option<f64> {
    let component = scene
        .behavior_mut::<CounterBehavior>()?
        .components
        .get_mut(actor)?;
    if !component.is_enabled() {
        return None;
    }
    let clamped = component.props.clamp(value);
    if clamped == component.props.value {
        return Some(clamped);
    }
    component.props.value = clamped;

    scene.fire_if::<CounterChangesTrigger>(actor, RuleExtras::default(), |params| params.holds(clamped));
    Some(clamped)
}

tableau_core::props! {
    pub struct CounterComparisonParams {
        comparison: String = String::from("equal") => PropAttribs::new().allowed(COMPARISONS),
        value: f64 = 0.0,
    }
}

impl CounterComparisonParams {
    fn holds(&self, current: f64) -> bool {
        compare(&self.comparison, current, self.value)
    }
}

/// Fires when the counter changes to a value satisfying the comparison
pub struct CounterChangesTrigger;

impl Trigger for CounterChangesTrigger {
    const NAME: &'static str = "counter changes";
    type Owner = CounterBehavior;
    type Params = CounterComparisonParams;
}

pub struct CounterMeetsCondition {
    params: CounterComparisonParams,
}

impl RuleElement for CounterMeetsCondition {
    const NAME: &'static str = "counter meets condition";
    type Owner = CounterBehavior;
    type Params = CounterComparisonParams;

    fn from_params(params: CounterComparisonParams) -> Self {
        Self { params }
    }
}

impl Condition for CounterMeetsCondition {
    fn eval(&self, ctx: &mut RuleContext<'_>) -> bool {
        ctx.behavior::<CounterBehavior>()
            .and_then(|counter| counter.value(ctx.actor))
            .map_or(false, |value| self.params.holds(value))
    }
}

tableau_core::props! {
    pub struct ChangeCounterParams {
        change_by: ExpressionRef = ExpressionRef::from(1.0) => PropAttribs::new().label("change by"),
    }
}

pub struct ChangeCounterResponse {
    params: ChangeCounterParams,
}

impl RuleElement for ChangeCounterResponse {
    const NAME: &'static str = "change counter";
    type Owner = CounterBehavior;
    type Params = ChangeCounterParams;

    fn from_params(params: ChangeCounterParams) -> Self {
        Self { params }
    }
}

impl Response for ChangeCounterResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let by = self.params.change_by.eval_number(ctx);
        let current = ctx.behavior::<CounterBehavior>().and_then(|c| c.value(ctx.actor));
        if let Some(current) = current {
            set_counter(ctx.scene, ctx.actor, current + by);
        }
    }
}

tableau_core::props! {
    pub struct SetCounterParams {
        set_to: ExpressionRef = ExpressionRef::from(0.0) => PropAttribs::new().label("set to"),
    }
}

pub struct SetCounterResponse {
    params: SetCounterParams,
}

impl RuleElement for SetCounterResponse {
    const NAME: &'static str = "set counter";
    type Owner = CounterBehavior;
    type Params = SetCounterParams;

    fn from_params(params: SetCounterParams) -> Self {
        Self { params }
    }
}

impl Response for SetCounterResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let to = self.params.set_to.eval_number(ctx);
        set_counter(ctx.scene, ctx.actor, to);
    }
}

pub fn register(types: &mut TypeRegistry) -> Result<()> {
    types.register_behavior::<CounterBehavior>()?;
    let rules = types.rules_mut();
    rules.register_trigger::<CounterChangesTrigger>()?;
    rules.register_condition::<CounterMeetsCondition>()?;
    rules.register_response::<ChangeCounterResponse>()?;
    rules.register_response::<SetCounterResponse>()?;
    Ok(())
}
