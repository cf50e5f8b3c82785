//! # Conversation State Machine
//!
//! Pure transition logic for every multi-step dialog. Handlers translate a
//! Telegram update into an [`Input`], call [`advance`] with the user's current
//! state, store the returned state and render the returned [`Effect`]. No I/O
//! happens here, so each transition is one synchronous read-then-write of the
//! user's state.
//!
//! Estimation flow:
//!
//! ```text
//! Idle -> AwaitingBrand -> AwaitingModel -> AwaitingYear
//!      -> AwaitingMileage -> AwaitingCondition -> Idle
//! ```
//!
//! Admin flows share one mechanism: [`AdminFlow::fields`] lists the steps and
//! each text message fills the next one until a typed [`AdminCommand`] can be
//! built.

use tracing::debug;

use crate::catalog::{CarCatalog, CarRow, CatalogKind};
use crate::dialogue::{
    parse_mileage, AdminFlow, ConversationState, FieldValue, InputError,
};
use crate::estimator::{baseline_price, condition, PriceEstimator};

/// Something the user did, already decoded from the Telegram update
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    StartEstimate,
    /// Position in the brand list shown to the user
    SelectBrand(usize),
    /// Position in the selected brand's model list
    SelectModel(usize),
    SelectYear(i32),
    SelectCondition(usize),
    Text(String),
    StartAdminFlow(AdminFlow),
    StartSearch,
    StartCatalogUpload(CatalogKind),
    /// Cancel button, main menu button or `/start`
    Cancel,
}

/// The result of a completed estimation
#[derive(Clone, Debug, PartialEq)]
pub struct Estimate {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub mileage: u64,
    pub condition_index: usize,
    pub condition_label_key: &'static str,
    pub base_price: f64,
    pub price: i64,
}

/// A completed admin flow, ready to be applied to the data store
#[derive(Clone, Debug, PartialEq)]
pub enum AdminCommand {
    AddAdmin { user_id: i64 },
    SetSponsor { name: String, url: String },
    Broadcast { text: String },
    SetMenuLabel { key: String, label: String },
    SetMenuUrl { key: String, url: String },
    SetSupport { contact: String },
    SetChannelUrl { url: String },
    AddCar(CarRow),
}

/// What the user should see after a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    ShowBrands { brands: Vec<String> },
    /// The chosen brand is no longer listed; pick again
    BrandNotFound { brands: Vec<String> },
    ShowModels { brand: String, models: Vec<String> },
    /// The chosen model is no longer listed under `brand`; pick again
    ModelNotFound { brand: String, models: Vec<String> },
    ShowYears { years: Vec<i32> },
    AskMileage,
    InvalidMileage,
    ShowConditions,
    Estimated(Estimate),
    /// The selected model disappeared from the catalog mid-flow
    CatalogChanged { brand: String, model: String },
    /// A button from an earlier or abandoned flow was pressed
    Expired,
    AskField { flow: AdminFlow, step: usize },
    InvalidField { flow: AdminFlow, step: usize, error: InputError },
    AdminCompleted(AdminCommand),
    AskSearchQuery,
    Search { query: String },
    AskCatalogFile { kind: CatalogKind },
    Cancelled,
    /// Input that means nothing in the current phase; state is kept
    Ignored,
}

/// New state plus the effect to render
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: ConversationState,
    pub effect: Effect,
}

impl Transition {
    fn new(state: ConversationState, effect: Effect) -> Self {
        Self { state, effect }
    }

    fn idle(effect: Effect) -> Self {
        Self::new(ConversationState::Idle, effect)
    }
}

/// Read-only collaborators a transition may consult
#[derive(Clone, Copy, Debug)]
pub struct FlowContext<'a> {
    pub catalog: &'a CarCatalog,
    pub estimator: &'a PriceEstimator,
}

/// Compute the next state for `input`
pub fn advance(state: ConversationState, input: Input, ctx: FlowContext<'_>) -> Transition {
    debug!(phase = ?state.phase(), input = ?input, "Advancing conversation");

    match input {
        Input::Cancel => Transition::idle(Effect::Cancelled),
        Input::StartEstimate => Transition::new(
            ConversationState::AwaitingBrand,
            Effect::ShowBrands {
                brands: ctx.catalog.brands(),
            },
        ),
        Input::StartAdminFlow(flow) => Transition::new(
            ConversationState::AdminInput {
                flow: flow.clone(),
                answers: Vec::new(),
            },
            Effect::AskField { flow, step: 0 },
        ),
        Input::StartSearch => {
            Transition::new(ConversationState::AwaitingSearchQuery, Effect::AskSearchQuery)
        }
        Input::StartCatalogUpload(kind) => Transition::new(
            ConversationState::AwaitingCatalogFile { kind },
            Effect::AskCatalogFile { kind },
        ),
        Input::SelectBrand(index) => select_brand(state, index, ctx),
        Input::SelectModel(index) => select_model(state, index, ctx),
        Input::SelectYear(year) => select_year(state, year, ctx),
        Input::SelectCondition(index) => select_condition(state, index, ctx),
        Input::Text(text) => receive_text(state, text),
    }
}

fn select_brand(state: ConversationState, index: usize, ctx: FlowContext<'_>) -> Transition {
    if !matches!(state, ConversationState::AwaitingBrand) {
        return Transition::idle(Effect::Expired);
    }

    let brands = ctx.catalog.brands();
    let Some(brand) = brands.get(index).cloned() else {
        return Transition::new(state, Effect::BrandNotFound { brands });
    };

    match ctx.catalog.models(&brand) {
        Some(models) => Transition::new(
            ConversationState::AwaitingModel {
                brand: brand.clone(),
            },
            Effect::ShowModels { brand, models },
        ),
        None => Transition::new(state, Effect::BrandNotFound { brands }),
    }
}

fn select_model(state: ConversationState, index: usize, ctx: FlowContext<'_>) -> Transition {
    let ConversationState::AwaitingModel { brand } = state else {
        return Transition::idle(Effect::Expired);
    };

    let Some(models) = ctx.catalog.models(&brand) else {
        // The brand itself was removed while the user was choosing
        return Transition::new(
            ConversationState::AwaitingBrand,
            Effect::BrandNotFound {
                brands: ctx.catalog.brands(),
            },
        );
    };

    let Some(model) = models.get(index).cloned() else {
        return Transition::new(
            ConversationState::AwaitingModel {
                brand: brand.clone(),
            },
            Effect::ModelNotFound { brand, models },
        );
    };

    Transition::new(
        ConversationState::AwaitingYear { brand, model },
        Effect::ShowYears {
            years: ctx.estimator.selectable_years(),
        },
    )
}

fn select_year(state: ConversationState, year: i32, ctx: FlowContext<'_>) -> Transition {
    let ConversationState::AwaitingYear { brand, model } = state else {
        return Transition::idle(Effect::Expired);
    };

    let years = ctx.estimator.selectable_years();
    if !years.contains(&year) {
        return Transition::new(
            ConversationState::AwaitingYear { brand, model },
            Effect::ShowYears { years },
        );
    }

    Transition::new(
        ConversationState::AwaitingMileage { brand, model, year },
        Effect::AskMileage,
    )
}

fn select_condition(state: ConversationState, index: usize, ctx: FlowContext<'_>) -> Transition {
    let ConversationState::AwaitingCondition {
        brand,
        model,
        year,
        mileage,
    } = state
    else {
        return Transition::idle(Effect::Expired);
    };

    let Some(code) = condition(index) else {
        return Transition::new(
            ConversationState::AwaitingCondition {
                brand,
                model,
                year,
                mileage,
            },
            Effect::ShowConditions,
        );
    };

    let Some(base_price) = baseline_price(ctx.catalog, &brand, &model) else {
        return Transition::idle(Effect::CatalogChanged { brand, model });
    };

    let price = ctx
        .estimator
        .estimate(base_price, year, mileage, code.discount);

    Transition::idle(Effect::Estimated(Estimate {
        brand,
        model,
        year,
        mileage,
        condition_index: index,
        condition_label_key: code.label_key,
        base_price,
        price,
    }))
}

fn receive_text(state: ConversationState, text: String) -> Transition {
    match state {
        ConversationState::AwaitingMileage { brand, model, year } => match parse_mileage(&text) {
            Ok(mileage) => Transition::new(
                ConversationState::AwaitingCondition {
                    brand,
                    model,
                    year,
                    mileage,
                },
                Effect::ShowConditions,
            ),
            Err(_) => Transition::new(
                ConversationState::AwaitingMileage { brand, model, year },
                Effect::InvalidMileage,
            ),
        },
        ConversationState::AdminInput { flow, answers } => admin_answer(flow, answers, &text),
        ConversationState::AwaitingSearchQuery => {
            let query = text.trim();
            if query.is_empty() {
                Transition::new(ConversationState::AwaitingSearchQuery, Effect::AskSearchQuery)
            } else {
                Transition::idle(Effect::Search {
                    query: query.to_string(),
                })
            }
        }
        ConversationState::AwaitingCatalogFile { kind } => Transition::new(
            ConversationState::AwaitingCatalogFile { kind },
            Effect::AskCatalogFile { kind },
        ),
        other => Transition::new(other, Effect::Ignored),
    }
}

fn admin_answer(flow: AdminFlow, mut answers: Vec<FieldValue>, text: &str) -> Transition {
    let fields = flow.fields();
    let step = answers.len();

    let Some(spec) = fields.get(step) else {
        return Transition::idle(Effect::Expired);
    };

    match spec.kind.validate(text) {
        Ok(value) => answers.push(value),
        Err(error) => {
            return Transition::new(
                ConversationState::AdminInput {
                    flow: flow.clone(),
                    answers,
                },
                Effect::InvalidField { flow, step, error },
            );
        }
    }

    if answers.len() < fields.len() {
        return Transition::new(
            ConversationState::AdminInput {
                flow: flow.clone(),
                answers,
            },
            Effect::AskField {
                flow,
                step: step + 1,
            },
        );
    }

    match build_command(&flow, answers) {
        Some(command) => Transition::idle(Effect::AdminCompleted(command)),
        None => Transition::idle(Effect::Expired),
    }
}

fn build_command(flow: &AdminFlow, answers: Vec<FieldValue>) -> Option<AdminCommand> {
    use FieldValue::{Integer, Number, Text};

    let command = match (flow, answers.as_slice()) {
        (AdminFlow::AddAdmin, [Integer(user_id)]) => AdminCommand::AddAdmin { user_id: *user_id },
        (AdminFlow::SetSponsor, [Text(name), Text(url)]) => AdminCommand::SetSponsor {
            name: name.clone(),
            url: url.clone(),
        },
        (AdminFlow::Broadcast, [Text(text)]) => AdminCommand::Broadcast { text: text.clone() },
        (AdminFlow::EditMenuLabel { key }, [Text(label)]) => AdminCommand::SetMenuLabel {
            key: key.clone(),
            label: label.clone(),
        },
        (AdminFlow::EditMenuUrl { key }, [Text(url)]) => AdminCommand::SetMenuUrl {
            key: key.clone(),
            url: url.clone(),
        },
        (AdminFlow::SetSupport, [Text(contact)]) => AdminCommand::SetSupport {
            contact: contact.clone(),
        },
        (AdminFlow::SetChannelUrl, [Text(url)]) => AdminCommand::SetChannelUrl { url: url.clone() },
        (
            AdminFlow::AddCar,
            [Text(brand), Text(model), Text(variant), Number(market), Number(factory)],
        ) => AdminCommand::AddCar(CarRow {
            brand: brand.clone(),
            model: model.clone(),
            variant: variant.clone(),
            market_price: *market,
            factory_price: *factory,
        }),
        _ => return None,
    };

    Some(command)
}
