//! Rule elements every scene has, owned by the Rules behavior

use super::{
    compare, register_expressions, BoxedResponse, Condition, ExpressionRef, LoadCx, Response, RuleContext,
    RuleElement, RulesBehavior, Trigger, COMPARISONS,
};
use crate::archive::Reader;
use crate::error::Result;
use crate::props::{NoParams, PropAttribs};
use crate::registry::TypeRegistry;
use crate::variables::VariableRef;

/// Fires once for an actor after its Rules component is enabled
pub struct CreateTrigger;

impl Trigger for CreateTrigger {
    const NAME: &'static str = "create";
    type Owner = RulesBehavior;
    type Params = NoParams;
}

crate::props! {
    pub struct NoteParams {
        note: String = String::new() => PropAttribs::new().label("note"),
    }
}

/// Does nothing but log its text
pub struct NoteResponse {
    params: NoteParams,
}

impl RuleElement for NoteResponse {
    const NAME: &'static str = "note";
    type Owner = RulesBehavior;
    type Params = NoteParams;

    fn from_params(params: NoteParams) -> Self {
        Self { params }
    }
}

impl Response for NoteResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        tracing::info!(actor = %ctx.actor, note = %self.params.note, "rule note");
    }
}

/// Runs a list of responses in order
///
/// Authored as `{"name": "sequence", "params": {"responses": [..]}}`.
pub struct SequenceResponse {
    responses: Vec<BoxedResponse>,
}

impl SequenceResponse {
    pub fn new(responses: Vec<BoxedResponse>) -> Self {
        Self { responses }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl RuleElement for SequenceResponse {
    const NAME: &'static str = "sequence";
    type Owner = RulesBehavior;
    type Params = NoParams;

    fn from_params(_params: NoParams) -> Self {
        Self::new(Vec::new())
    }

    fn load(reader: &Reader<'_>, cx: &LoadCx<'_>) -> Self {
        let mut responses = Vec::new();
        reader.obj("params", |params| {
            params.each("responses", |response| match cx.load_response(response) {
                Some(response) => responses.push(response),
                None => tracing::warn!("sequence step skipped"),
            });
        });
        Self::new(responses)
    }
}

impl Response for SequenceResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        for response in &self.responses {
            if !ctx.scene.has_actor(ctx.actor) {
                break;
            }
            response.execute(ctx);
        }
    }
}

/// Removes the actor running the rule
pub struct DestroyResponse;

impl RuleElement for DestroyResponse {
    const NAME: &'static str = "destroy";
    type Owner = RulesBehavior;
    type Params = NoParams;

    fn from_params(_params: NoParams) -> Self {
        Self
    }
}

impl Response for DestroyResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        ctx.scene.remove_actor(ctx.actor);
    }
}

/// Rebuilds the scene from its loaded document after the current frame
pub struct RestartSceneResponse;

impl RuleElement for RestartSceneResponse {
    const NAME: &'static str = "restart scene";
    type Owner = RulesBehavior;
    type Params = NoParams;

    fn from_params(_params: NoParams) -> Self {
        Self
    }
}

impl Response for RestartSceneResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        ctx.scene.request_restart();
    }
}

crate::props! {
    pub struct VariableChangesParams {
        variable: VariableRef = VariableRef::default(),
    }
}

/// Fires when a variable's value changes
pub struct VariableChangesTrigger;

impl Trigger for VariableChangesTrigger {
    const NAME: &'static str = "variable changes";
    type Owner = RulesBehavior;
    type Params = VariableChangesParams;
}

crate::props! {
    pub struct VariableComparisonParams {
        variable: VariableRef = VariableRef::default(),
        comparison: String = String::from("equal") => PropAttribs::new().allowed(COMPARISONS),
        value: f64 = 0.0,
    }
}

impl VariableComparisonParams {
    fn holds(&self, current: f64) -> bool {
        compare(&self.comparison, current, self.value)
    }
}

/// Fires when a variable changes to a value satisfying the comparison
pub struct VariableReachesValueTrigger;

impl Trigger for VariableReachesValueTrigger {
    const NAME: &'static str = "variable reaches value";
    type Owner = RulesBehavior;
    type Params = VariableComparisonParams;
}

/// Compares a variable's current value
pub struct VariableMeetsCondition {
    params: VariableComparisonParams,
}

impl RuleElement for VariableMeetsCondition {
    const NAME: &'static str = "variable meets condition";
    type Owner = RulesBehavior;
    type Params = VariableComparisonParams;

    fn from_params(params: VariableComparisonParams) -> Self {
        Self { params }
    }
}

impl Condition for VariableMeetsCondition {
    fn eval(&self, ctx: &mut RuleContext<'_>) -> bool {
        ctx.scene
            .variables()
            .get(&self.params.variable)
            .as_number()
            .map_or(false, |current| self.params.holds(current))
    }
}

crate::props! {
    pub struct SetVariableParams {
        variable: VariableRef = VariableRef::default(),
        set_to: ExpressionRef = ExpressionRef::from(0.0) => PropAttribs::new().label("set to"),
    }
}

/// Assigns a variable
pub struct SetVariableResponse {
    params: SetVariableParams,
}

impl RuleElement for SetVariableResponse {
    const NAME: &'static str = "set variable";
    type Owner = RulesBehavior;
    type Params = SetVariableParams;

    fn from_params(params: SetVariableParams) -> Self {
        Self { params }
    }
}

impl Response for SetVariableResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let value = self.params.set_to.eval(ctx);
        ctx.scene.set_variable(&self.params.variable, value);
    }
}

crate::props! {
    pub struct ChangeVariableParams {
        variable: VariableRef = VariableRef::default(),
        change_by: ExpressionRef = ExpressionRef::from(1.0) => PropAttribs::new().label("change by"),
    }
}

/// Adds to a numeric variable
pub struct ChangeVariableResponse {
    params: ChangeVariableParams,
}

impl RuleElement for ChangeVariableResponse {
    const NAME: &'static str = "change variable";
    type Owner = RulesBehavior;
    type Params = ChangeVariableParams;

    fn from_params(params: ChangeVariableParams) -> Self {
        Self { params }
    }
}

impl Response for ChangeVariableResponse {
    fn run(&self, ctx: &mut RuleContext<'_>) {
        let by = self.params.change_by.eval_number(ctx);
        let current = ctx.scene.variables().get(&self.params.variable).number_or(0.0);
        ctx.scene
            .set_variable(&self.params.variable, (current + by).into());
    }
}

/// Register the Rules behavior, its elements and the built-in expressions
pub fn register_builtins(types: &mut TypeRegistry) -> Result<()> {
    types.register_behavior::<RulesBehavior>()?;

    let rules = types.rules_mut();
    rules.register_trigger::<CreateTrigger>()?;
    rules.register_trigger::<VariableChangesTrigger>()?;
    rules.register_trigger::<VariableReachesValueTrigger>()?;
    rules.register_condition::<VariableMeetsCondition>()?;
    rules.register_response::<NoteResponse>()?;
    rules.register_response::<SequenceResponse>()?;
    rules.register_response::<DestroyResponse>()?;
    rules.register_response::<RestartSceneResponse>()?;
    rules.register_response::<SetVariableResponse>()?;
    rules.register_response::<ChangeVariableResponse>()?;
    register_expressions(rules)?;
    Ok(())
}
