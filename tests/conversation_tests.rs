//! # Conversation Tests
//!
//! Drives the conversation state machine through complete flows.

use carprice_bot::catalog::{CarCatalog, CarRow, CatalogKind};
use carprice_bot::conversation::{advance, AdminCommand, Effect, FlowContext, Input, Transition};
use carprice_bot::dialogue::{AdminFlow, ConversationState, FieldValue, InputError, Phase};
use carprice_bot::estimator::PriceEstimator;

const REFERENCE_YEAR: i32 = 1404;

// Positions in the lists shown to the user; brands are sorted by name
const IRAN_KHODRO: usize = 0;
const SAIPA: usize = 1;
const SHAHIN: usize = 0;
const QUICK: usize = 1;

fn catalog() -> CarCatalog {
    let mut catalog = CarCatalog::default();
    let rows = [
        ("Saipa", "Shahin", "GL", 1000.0),
        ("Saipa", "Shahin", "CVT", 1200.0),
        ("Saipa", "Quick", "R", 700.0),
        ("Iran Khodro", "Dena", "Plus", 1300.0),
    ];
    for (brand, model, variant, price) in rows {
        catalog.upsert_variant(&CarRow {
            brand: brand.to_string(),
            model: model.to_string(),
            variant: variant.to_string(),
            market_price: price,
            factory_price: price * 0.7,
        });
    }
    catalog
}

/// Small harness replaying inputs against one user's state
struct Session {
    catalog: CarCatalog,
    estimator: PriceEstimator,
    state: ConversationState,
    effects: Vec<Effect>,
}

impl Session {
    fn new() -> Self {
        Self {
            catalog: catalog(),
            estimator: PriceEstimator::new(REFERENCE_YEAR),
            state: ConversationState::Idle,
            effects: Vec::new(),
        }
    }

    fn send(&mut self, input: Input) -> &Effect {
        let ctx = FlowContext {
            catalog: &self.catalog,
            estimator: &self.estimator,
        };
        let Transition { state, effect } = advance(self.state.clone(), input, ctx);
        self.state = state;
        self.effects.push(effect);
        self.effects.last().unwrap()
    }

    fn phase(&self) -> Phase {
        self.state.phase()
    }

    fn estimates(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Estimated(_)))
            .count()
    }
}

fn to_mileage_step(session: &mut Session) {
    session.send(Input::StartEstimate);
    session.send(Input::SelectBrand(SAIPA));
    session.send(Input::SelectModel(SHAHIN));
    session.send(Input::SelectYear(REFERENCE_YEAR - 2));
}

/// Full estimation flow ends in Idle with exactly one estimate
#[test]
fn test_happy_path_emits_one_estimate() {
    let mut session = Session::new();

    assert!(matches!(
        session.send(Input::StartEstimate),
        Effect::ShowBrands { brands } if brands.len() == 2
    ));
    assert_eq!(session.phase(), Phase::AwaitingBrand);

    assert!(matches!(
        session.send(Input::SelectBrand(SAIPA)),
        Effect::ShowModels { models, .. } if models == &["Shahin".to_string(), "Quick".to_string()]
    ));
    assert_eq!(session.phase(), Phase::AwaitingModel);

    assert!(matches!(
        session.send(Input::SelectModel(SHAHIN)),
        Effect::ShowYears { years } if years.len() == 15 && years[0] == REFERENCE_YEAR
    ));
    assert_eq!(session.phase(), Phase::AwaitingYear);

    assert_eq!(session.send(Input::SelectYear(REFERENCE_YEAR - 2)), &Effect::AskMileage);
    assert_eq!(session.phase(), Phase::AwaitingMileage);

    assert_eq!(session.send(Input::Text("150,000".to_string())), &Effect::ShowConditions);
    assert_eq!(
        session.state,
        ConversationState::AwaitingCondition {
            brand: "Saipa".to_string(),
            model: "Shahin".to_string(),
            year: REFERENCE_YEAR - 2,
            mileage: 150_000,
        }
    );

    let Effect::Estimated(estimate) = session.send(Input::SelectCondition(0)).clone() else {
        panic!("expected an estimate");
    };
    assert_eq!(estimate.base_price, 1000.0);
    assert_eq!(estimate.mileage, 150_000);
    assert_eq!(estimate.condition_label_key, "condition-clean");
    // age 2 drops 0.085, 110,000 km over expectation drops 0.11
    assert_eq!(estimate.price, 805);

    assert_eq!(session.state, ConversationState::Idle);
    assert_eq!(session.estimates(), 1);
}

/// Non-numeric mileage keeps the user at the mileage step
#[test]
fn test_invalid_mileage_keeps_state() {
    let mut session = Session::new();
    to_mileage_step(&mut session);
    let before = session.state.clone();

    assert_eq!(session.send(Input::Text("abc".to_string())), &Effect::InvalidMileage);
    assert_eq!(session.state, before);

    assert_eq!(session.send(Input::Text("۸۵۰۰۰".to_string())), &Effect::ShowConditions);
    assert_eq!(session.phase(), Phase::AwaitingCondition);
}

/// Cancel returns to Idle from every phase
#[test]
fn test_cancel_from_every_phase() {
    let setups: Vec<Vec<Input>> = vec![
        vec![Input::StartEstimate],
        vec![Input::StartEstimate, Input::SelectBrand(SAIPA)],
        vec![
            Input::StartEstimate,
            Input::SelectBrand(SAIPA),
            Input::SelectModel(QUICK),
        ],
        vec![
            Input::StartEstimate,
            Input::SelectBrand(SAIPA),
            Input::SelectModel(QUICK),
            Input::SelectYear(REFERENCE_YEAR),
        ],
        vec![
            Input::StartEstimate,
            Input::SelectBrand(SAIPA),
            Input::SelectModel(QUICK),
            Input::SelectYear(REFERENCE_YEAR),
            Input::Text("1000".to_string()),
        ],
        vec![Input::StartAdminFlow(AdminFlow::AddCar), Input::Text("Saipa".to_string())],
        vec![Input::StartSearch],
        vec![Input::StartCatalogUpload(CatalogKind::Mobiles)],
    ];

    for inputs in setups {
        let mut session = Session::new();
        for input in inputs {
            session.send(input);
        }
        assert!(!session.state.is_idle(), "setup should leave Idle");

        assert_eq!(session.send(Input::Cancel), &Effect::Cancelled);
        assert_eq!(session.state, ConversationState::Idle);
    }
}

/// A condition button pressed outside the flow aborts instead of guessing
#[test]
fn test_out_of_sequence_condition_expires() {
    let mut session = Session::new();
    assert_eq!(session.send(Input::SelectCondition(0)), &Effect::Expired);
    assert_eq!(session.state, ConversationState::Idle);

    to_mileage_step(&mut session);
    assert_eq!(session.send(Input::SelectCondition(3)), &Effect::Expired);
    assert_eq!(session.state, ConversationState::Idle);
    assert_eq!(session.estimates(), 0);
}

/// Old brand buttons from a finished flow expire
#[test]
fn test_replayed_brand_button_expires() {
    let mut session = Session::new();
    session.send(Input::StartEstimate);
    session.send(Input::SelectBrand(SAIPA));

    assert_eq!(session.send(Input::SelectBrand(SAIPA)), &Effect::Expired);
    assert_eq!(session.state, ConversationState::Idle);
}

/// Stale brand and model positions re-prompt without advancing
#[test]
fn test_unknown_brand_and_model_reprompt() {
    let mut session = Session::new();
    session.send(Input::StartEstimate);

    assert!(matches!(
        session.send(Input::SelectBrand(7)),
        Effect::BrandNotFound { brands } if brands.len() == 2
    ));
    assert_eq!(session.phase(), Phase::AwaitingBrand);

    session.send(Input::SelectBrand(IRAN_KHODRO));
    assert!(matches!(
        session.send(Input::SelectModel(QUICK)),
        Effect::ModelNotFound { brand, models } if brand == "Iran Khodro" && models.len() == 1
    ));
    assert_eq!(session.phase(), Phase::AwaitingModel);
}

/// Model names too long for a name-carrying button are still selectable
#[test]
fn test_long_model_name_is_selectable() {
    let mut session = Session::new();
    let long_name = "م".repeat(32);
    session.catalog.upsert_variant(&CarRow {
        brand: "Saipa".to_string(),
        model: long_name.clone(),
        variant: "Base".to_string(),
        market_price: 500.0,
        factory_price: 400.0,
    });

    session.send(Input::StartEstimate);
    session.send(Input::SelectBrand(SAIPA));
    session.send(Input::SelectModel(2));

    assert_eq!(
        session.state,
        ConversationState::AwaitingYear {
            brand: "Saipa".to_string(),
            model: long_name,
        }
    );
}

/// Years outside the offered list re-prompt
#[test]
fn test_year_outside_list_reprompts() {
    let mut session = Session::new();
    session.send(Input::StartEstimate);
    session.send(Input::SelectBrand(SAIPA));
    session.send(Input::SelectModel(QUICK));

    assert!(matches!(session.send(Input::SelectYear(1350)), Effect::ShowYears { .. }));
    assert_eq!(session.phase(), Phase::AwaitingYear);
    assert!(matches!(session.send(Input::SelectYear(REFERENCE_YEAR + 1)), Effect::ShowYears { .. }));
}

/// Out-of-range condition index re-shows the conditions
#[test]
fn test_condition_out_of_range_reprompts() {
    let mut session = Session::new();
    to_mileage_step(&mut session);
    session.send(Input::Text("40000".to_string()));

    assert_eq!(session.send(Input::SelectCondition(99)), &Effect::ShowConditions);
    assert_eq!(session.phase(), Phase::AwaitingCondition);
}

/// A model removed mid-flow aborts with a catalog-changed notice
#[test]
fn test_model_removed_mid_flow() {
    let mut session = Session::new();
    to_mileage_step(&mut session);
    session.send(Input::Text("40000".to_string()));

    session.catalog = CarCatalog::default();
    assert_eq!(
        session.send(Input::SelectCondition(0)),
        &Effect::CatalogChanged {
            brand: "Saipa".to_string(),
            model: "Shahin".to_string(),
        }
    );
    assert_eq!(session.state, ConversationState::Idle);
}

/// Starting an estimate mid-flow restarts it
#[test]
fn test_start_estimate_restarts_flow() {
    let mut session = Session::new();
    to_mileage_step(&mut session);

    assert!(matches!(session.send(Input::StartEstimate), Effect::ShowBrands { .. }));
    assert_eq!(session.state, ConversationState::AwaitingBrand);
}

/// Free text while idle is ignored
#[test]
fn test_idle_text_is_ignored() {
    let mut session = Session::new();
    assert_eq!(session.send(Input::Text("hello".to_string())), &Effect::Ignored);
    assert_eq!(session.state, ConversationState::Idle);
}

/// The add-car flow validates each answer and yields a typed command
#[test]
fn test_add_car_flow() {
    let mut session = Session::new();

    assert_eq!(
        session.send(Input::StartAdminFlow(AdminFlow::AddCar)),
        &Effect::AskField {
            flow: AdminFlow::AddCar,
            step: 0
        }
    );
    session.send(Input::Text("Saipa".to_string()));
    session.send(Input::Text("Saina".to_string()));
    session.send(Input::Text("S".to_string()));

    assert_eq!(
        session.send(Input::Text("cheap".to_string())),
        &Effect::InvalidField {
            flow: AdminFlow::AddCar,
            step: 3,
            error: InputError::NotANumber,
        }
    );
    assert_eq!(
        session.state,
        ConversationState::AdminInput {
            flow: AdminFlow::AddCar,
            answers: vec![
                FieldValue::Text("Saipa".to_string()),
                FieldValue::Text("Saina".to_string()),
                FieldValue::Text("S".to_string()),
            ],
        }
    );

    session.send(Input::Text("۹۵۰".to_string()));
    let effect = session.send(Input::Text("820".to_string())).clone();

    assert_eq!(
        effect,
        Effect::AdminCompleted(AdminCommand::AddCar(CarRow {
            brand: "Saipa".to_string(),
            model: "Saina".to_string(),
            variant: "S".to_string(),
            market_price: 950.0,
            factory_price: 820.0,
        }))
    );
    assert_eq!(session.state, ConversationState::Idle);
}

/// Sponsor needs a name and a valid URL
#[test]
fn test_sponsor_flow_rejects_bad_url() {
    let mut session = Session::new();
    session.send(Input::StartAdminFlow(AdminFlow::SetSponsor));
    session.send(Input::Text("Best Dealer".to_string()));

    assert!(matches!(
        session.send(Input::Text("dealer dot com".to_string())),
        Effect::InvalidField { error: InputError::InvalidUrl, step: 1, .. }
    ));

    assert_eq!(
        session.send(Input::Text("https://dealer.example".to_string())),
        &Effect::AdminCompleted(AdminCommand::SetSponsor {
            name: "Best Dealer".to_string(),
            url: "https://dealer.example".to_string(),
        })
    );
}

/// Admin ids must be positive numbers
#[test]
fn test_add_admin_flow() {
    let mut session = Session::new();
    session.send(Input::StartAdminFlow(AdminFlow::AddAdmin));

    assert!(matches!(
        session.send(Input::Text("-4".to_string())),
        Effect::InvalidField { error: InputError::NotPositive, .. }
    ));
    assert_eq!(
        session.send(Input::Text("123456789".to_string())),
        &Effect::AdminCompleted(AdminCommand::AddAdmin { user_id: 123_456_789 })
    );
}

/// Menu edits carry the menu key through the flow
#[test]
fn test_menu_label_flow_keeps_key() {
    let mut session = Session::new();
    session.send(Input::StartAdminFlow(AdminFlow::EditMenuLabel {
        key: "prices".to_string(),
    }));

    assert_eq!(
        session.send(Input::Text("  Price list ".to_string())),
        &Effect::AdminCompleted(AdminCommand::SetMenuLabel {
            key: "prices".to_string(),
            label: "Price list".to_string(),
        })
    );
}

/// Search takes one non-empty query
#[test]
fn test_search_flow() {
    let mut session = Session::new();
    assert_eq!(session.send(Input::StartSearch), &Effect::AskSearchQuery);
    assert_eq!(session.send(Input::Text("   ".to_string())), &Effect::AskSearchQuery);
    assert_eq!(session.phase(), Phase::AwaitingSearchQuery);

    assert_eq!(
        session.send(Input::Text(" dena ".to_string())),
        &Effect::Search {
            query: "dena".to_string()
        }
    );
    assert_eq!(session.state, ConversationState::Idle);
}

/// Text while waiting for a catalog file re-asks for the file
#[test]
fn test_catalog_upload_wants_a_file() {
    let mut session = Session::new();
    session.send(Input::StartCatalogUpload(CatalogKind::Cars));

    assert_eq!(
        session.send(Input::Text("here".to_string())),
        &Effect::AskCatalogFile {
            kind: CatalogKind::Cars
        }
    );
    assert_eq!(session.phase(), Phase::AwaitingCatalogFile);
}
