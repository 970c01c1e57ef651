use clap::Args;
use health_gateway::config::AppConfig;
use health_gateway::error::AppError;
use health_gateway::immunization::{
    build_orchestrator, public_query, RequestResult, ResultType, VaccineProofTemplate,
    VaccineStatusQuery,
};
use health_gateway::telemetry;
use serde::Serialize;

/// Who to look up: an HDID, or a PHN with birth date.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct SubjectArgs {
    /// Health Gateway user identifier (authenticated lookup)
    #[arg(long)]
    pub(crate) hdid: Option<String>,
    /// Personal health number (public lookup, requires --dob)
    #[arg(long, requires = "dob")]
    pub(crate) phn: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct StatusArgs {
    #[command(flatten)]
    pub(crate) subject: SubjectArgs,
    /// Birth date (YYYY-MM-DD) for public lookups
    #[arg(long)]
    pub(crate) dob: Option<String>,
    /// Keep re-querying while the registry refreshes
    #[arg(long)]
    pub(crate) wait: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ProofArgs {
    #[command(flatten)]
    pub(crate) subject: SubjectArgs,
    /// Birth date (YYYY-MM-DD) for public lookups
    #[arg(long)]
    pub(crate) dob: Option<String>,
    /// Proof template: provincial or federal (defaults to the configured print template)
    #[arg(long)]
    pub(crate) template: Option<String>,
}

fn subject_query(
    subject: &SubjectArgs,
    dob: Option<&str>,
    include_federal: bool,
) -> Result<VaccineStatusQuery, AppError> {
    match (&subject.hdid, &subject.phn) {
        (Some(hdid), _) => Ok(VaccineStatusQuery::by_hdid(hdid.clone(), include_federal)),
        (None, Some(phn)) => Ok(public_query(phn, dob.unwrap_or_default(), include_federal)?),
        (None, None) => Err(AppError::InvalidInput(
            "either --hdid or --phn is required".to_string(),
        )),
    }
}

/// Print the envelope; an `Error` result also fails the command.
fn render<T: Serialize>(result: RequestResult<T>) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
    println!("{rendered}");

    match (result.result_status, result.result_error) {
        (ResultType::Error, Some(error)) => Err(AppError::Workflow(error)),
        _ => Ok(()),
    }
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) async fn run_status(args: StatusArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config);
    let query = subject_query(&args.subject, args.dob.as_deref(), false)?;

    let result = if args.wait {
        orchestrator
            .resolver()
            .get_vaccine_status_with_retries(&query)
            .await
    } else {
        orchestrator.resolver().get_vaccine_status(&query).await
    };
    render(result)
}

pub(crate) async fn run_proof(args: ProofArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(&config);

    let template = match args.template.as_deref() {
        Some(raw) => raw
            .parse::<VaccineProofTemplate>()
            .map_err(AppError::InvalidInput)?,
        None => orchestrator.default_template(),
    };
    let query = subject_query(
        &args.subject,
        args.dob.as_deref(),
        template == VaccineProofTemplate::Federal,
    )?;

    render(orchestrator.get_vaccine_proof(&query, template).await)
}
