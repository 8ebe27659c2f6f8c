use crate::infra::{sample_applications, InMemoryLoanRepository};
use crate::routes::{decision_service, InMemoryDecisionService};
use chrono::Utc;
use clap::Args;
use loan_engine::config::AppConfig;
use loan_engine::error::AppError;
use loan_engine::workflows::decisioning::{
    ApplicationId, DecisionRequest, DecisionResponse, DecisionType, EmploymentType, LoanPurpose,
    ReviewInput, UserId,
};
use loan_engine::workflows::lifecycle::{
    ApplicationState, PersistedStateMachine, SimulatedStateMachine, StateTransitioner,
    TransitionOutcome, TransitionRequest,
};
use loan_engine::workflows::OperationContext;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    /// Decision request as inline JSON
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub(crate) request: Option<String>,
    /// Path to a JSON file holding the decision request
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the application lifecycle portion of the demo.
    #[arg(long)]
    pub(crate) skip_lifecycle: bool,
}

pub(crate) fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = match (args.request, args.file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "either --request or --file is required",
            )
            .into())
        }
    };

    let request: DecisionRequest = serde_json::from_str(&raw)?;
    let service = decision_service(&config, Utc::now())?;
    let decision = service.make_decision(&OperationContext::new(), &request)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let ctx = OperationContext::new();
    let service = decision_service(&config, Utc::now())?;

    println!("Loan decision demo");
    println!(
        "Policy: credit >= {} | DTI <= {:.2} | income >= {:.0} | approvals valid {} days",
        config.decision.min_credit_score,
        config.decision.max_dti_ratio,
        config.decision.min_annual_income,
        config.decision.approval_validity_days
    );
    println!("Active rules: {}", service.active_rules().len());

    let requests = [
        demo_request("app-1001", "user-001", 780, 1_500.0),
        demo_request("app-1002", "user-002", 550, 1_500.0),
        demo_request("app-1003", "user-003", 760, 3_600.0),
    ];

    for request in &requests {
        match service.make_decision(&ctx, request) {
            Ok(decision) => render_decision(&decision),
            Err(err) => println!("- {}: rejected ({})", request.application_id, err.code()),
        }
    }

    review_pending(&service, &ctx, &requests);

    match service.get_decision_history(&ctx, &UserId("user-001".to_string())) {
        Ok(history) => println!("\nDecision history for user-001: {} entries", history.len()),
        Err(err) => println!("\nDecision history unavailable: {}", err),
    }

    if args.skip_lifecycle {
        return Ok(());
    }

    println!("\nApplication lifecycle demo");
    let loans = Arc::new(InMemoryLoanRepository::seeded(sample_applications(Utc::now())));
    let machine = PersistedStateMachine::with_max_attempts(loans, config.lifecycle.max_attempts);

    let steps = [
        TransitionRequest::new("app-1001", ApplicationState::UnderReview)
            .reason("Documents received"),
        TransitionRequest::new("app-1001", ApplicationState::Approved)
            .reason("Automated approval")
            .from_state(ApplicationState::UnderReview),
        TransitionRequest::new("app-1001", ApplicationState::Approved)
            .from_state(ApplicationState::Submitted),
        TransitionRequest::new("app-1002", ApplicationState::Denied)
            .reason("Credit below minimum")
            .acted_by("underwriter-7"),
        TransitionRequest::new("app-1002", ApplicationState::Active),
        TransitionRequest::new("app-1003", ApplicationState::Funded).reason("Funds disbursed"),
    ];

    for step in steps {
        let label = format!("{} -> {}", step.application_id, step.to_state);
        match machine.transition_to(&ctx, step) {
            Ok(outcome) => render_outcome(&label, &outcome),
            Err(err) => println!("- {label}: refused [{}] {}", err.code(), err),
        }
    }

    match machine.transition_history(&ctx, &ApplicationId("app-1001".to_string())) {
        Ok(history) => {
            println!("Audit trail for app-1001:");
            for record in history {
                println!(
                    "  - {} -> {} ({})",
                    record
                        .from_state
                        .map(|state| state.label())
                        .unwrap_or("none"),
                    record.to_state,
                    record.reason
                );
            }
        }
        Err(err) => println!("Audit trail unavailable: {}", err),
    }

    let simulator = SimulatedStateMachine::new(config.lifecycle.simulated_from_state);
    match simulator.transition_to(
        &ctx,
        TransitionRequest::new("app-preview", ApplicationState::Submitted),
    ) {
        Ok(outcome) => render_outcome("app-preview -> submitted (simulated)", &outcome),
        Err(err) => println!("- simulated transition refused: {}", err),
    }

    Ok(())
}

fn review_pending(
    service: &InMemoryDecisionService,
    ctx: &OperationContext,
    requests: &[DecisionRequest],
) {
    for request in requests {
        let pending = match service.get_decision(ctx, &request.application_id) {
            Ok(decision) if decision.decision == DecisionType::ManualReview => decision,
            _ => continue,
        };

        let review = ReviewInput {
            reviewer_id: UserId("underwriter-7".to_string()),
            decision: DecisionType::Conditional,
            notes: "Approved at a reduced amount pending debt statements".to_string(),
            approved_amount: Some((request.loan_amount * 0.75).round()),
        };
        match service.record_review(ctx, &pending.application_id, review) {
            Ok(reviewed) => println!(
                "- Review recorded for {}: {}",
                reviewed.application_id,
                reviewed.summary()
            ),
            Err(err) => println!("- Review for {} refused: {}", pending.application_id, err),
        }
    }
}

fn render_decision(decision: &DecisionResponse) {
    println!(
        "- {}: {} | risk {:.2} ({}) | rate {:.2}%{}",
        decision.application_id,
        decision.decision.label(),
        decision.risk_score,
        decision.risk_category.label(),
        decision.interest_rate,
        if decision.review_required {
            " | review required"
        } else {
            ""
        }
    );
    println!("  {}", decision.summary());
    for factor in &decision.risk_factors {
        println!("    risk factor: {} ({:?})", factor.factor, factor.impact);
    }
    if !decision.required_documents.is_empty() {
        println!("    documents: {}", decision.required_documents.join(", "));
    }
}

fn render_outcome(label: &str, outcome: &TransitionOutcome) {
    let mut notes = Vec::new();
    if outcome.idempotent {
        notes.push("idempotent");
    }
    if outcome.simulated {
        notes.push("simulated");
    }
    if !outcome.audit_recorded && !outcome.simulated && !outcome.idempotent {
        notes.push("audit missing");
    }
    println!(
        "- {label}: {} -> {} (status {}){}",
        outcome.previous_state,
        outcome.new_state,
        outcome.new_status.label(),
        if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        }
    );
}

fn demo_request(id: &str, user: &str, credit_score: u16, monthly_debt: f64) -> DecisionRequest {
    DecisionRequest {
        application_id: ApplicationId(id.to_string()),
        user_id: UserId(user.to_string()),
        loan_amount: 20_000.0,
        annual_income: 90_000.0,
        monthly_income: 7_500.0,
        monthly_debt,
        credit_score,
        employment_type: EmploymentType::FullTime,
        requested_term: 36,
        loan_purpose: LoanPurpose::Personal,
        additional_data: BTreeMap::new(),
        requested_at: Utc::now(),
    }
}
