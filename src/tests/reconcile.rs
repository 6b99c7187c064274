use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::mock::ScriptedService;
use crate::{
    IgnoreRule, NameSource, PlanAction, ProviderConfig, Reconciler, RetryPolicy, RoleConfig,
    RoleError, TagSet,
};

static PREFIXED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^web-[0-9]{26}$").unwrap());

const TRUST_POLICY: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [{
        "Effect": "Allow",
        "Principal": {"Service": ["ec2.amazonaws.com", "ecs-tasks.amazonaws.com"]},
        "Action": "sts:AssumeRole"
    }]
}"#;

fn provider() -> ProviderConfig {
    ProviderConfig {
        default_tags: TagSet::from([("team", "platform"), ("env", "dev")]),
        ignore_tags: IgnoreRule::new(["Owner"], ["aws:"]),
        retry: RetryPolicy::new(Duration::from_secs(15), Duration::from_secs(120)),
        ..Default::default()
    }
}

fn role_config() -> RoleConfig {
    RoleConfig {
        name_prefix: Some("web-".to_string()),
        role_type: "aws".to_string(),
        trust_arn: "arn:aws:iam::123456789012:role/broker".to_string(),
        enable_access: true,
        trust_policy: Some(TRUST_POLICY.to_string()),
        tags: TagSet::from([("env", "prod"), ("Owner", "ops")]),
        wait_for_read: true,
        ..Default::default()
    }
}

fn reconciler(service: &Arc<ScriptedService>) -> Reconciler<Arc<ScriptedService>> {
    Reconciler::new(provider(), service.clone()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_create_produces_state_without_defaults_or_ignored_tags() {
    let service = Arc::new(
        ScriptedService::succeeding().with_remote_tags(TagSet::from([("aws:created-by", "broker")])),
    );
    let state = reconciler(&service)
        .create(&role_config(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(PREFIXED_NAME.is_match(&state.identity.name), "{}", state.identity.name);
    assert_eq!(state.identity.source, NameSource::Prefixed);
    assert_eq!(state.identity.name_prefix.as_deref(), Some("web-"));
    assert_eq!(state.id, format!("arn:broker:role/{}", state.identity.name));

    // Ignored tags are still sent on create.
    let sent = service.last_input().unwrap();
    assert_eq!(
        sent.tags,
        TagSet::from([("team", "platform"), ("env", "prod"), ("Owner", "ops")])
    );

    assert_eq!(state.tags, TagSet::from([("env", "prod")]));
    assert_eq!(state.tags_all.len(), 4);
    assert!(state.tags_all.contains_key("aws:created-by"));
    assert!(state.trust_policy.contains("ecs-tasks.amazonaws.com"));
}

#[tokio::test(start_paused = true)]
async fn test_plan_after_create_is_noop() {
    let service = Arc::new(
        ScriptedService::succeeding().with_remote_tags(TagSet::from([("aws:created-by", "broker")])),
    );
    let reconciler = reconciler(&service);
    let state = reconciler
        .create(&role_config(), &CancellationToken::new())
        .await
        .unwrap();

    let plan = reconciler.plan(&role_config(), Some(&state)).unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);
    assert_eq!(plan.identity, state.identity);
}

#[tokio::test(start_paused = true)]
async fn test_create_survives_eventual_consistency() {
    let service = Arc::new(
        ScriptedService::failing_first(2, "InvalidParameterValue: role cannot be assumed")
            .with_invisible_reads(1),
    );
    let state = reconciler(&service)
        .create(&role_config(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(service.create_calls(), 3);
    assert_eq!(service.get_calls(), 2);
    assert_eq!(state.tags, TagSet::from([("env", "prod")]));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_role_yields_no_state() {
    let service = Arc::new(ScriptedService::always_failing(
        "EntityAlreadyExists: Role already exists",
    ));
    let config = RoleConfig {
        name: Some("web".to_string()),
        ..role_config()
    };
    let err = reconciler(&service)
        .create(&config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RoleError::AlreadyExists { attempts: 1, .. }));
    assert!(err.to_string().contains("\"web\""));
    assert_eq!(service.create_calls(), 1);
    assert_eq!(service.get_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_makes_no_remote_calls() {
    let service = Arc::new(ScriptedService::succeeding());
    let config = RoleConfig {
        trust_arn: String::new(),
        ..role_config()
    };
    let err = reconciler(&service)
        .create(&config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RoleError::Validation(_)));
    assert_eq!(service.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_read_back_still_reports_created_role() {
    let service = Arc::new(ScriptedService::succeeding().with_read_error("access denied"));
    let state = reconciler(&service)
        .create(&role_config(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(service.get_calls(), 1);
    assert!(state.id.starts_with("arn:broker:role/web-"));
}

#[tokio::test(start_paused = true)]
async fn test_skip_read_back() {
    let service = Arc::new(ScriptedService::succeeding());
    let config = RoleConfig {
        wait_for_read: false,
        ..role_config()
    };
    reconciler(&service)
        .create(&config, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(service.get_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_read_recovers_prefix_of_generated_name() {
    let service = Arc::new(ScriptedService::succeeding());
    let name = "web-20240101120000000000000001";
    let state = reconciler(&service)
        .read(name, NameSource::Prefixed)
        .await
        .unwrap();

    assert_eq!(state.identity.name, name);
    assert_eq!(state.identity.name_prefix.as_deref(), Some("web-"));
    assert_eq!(state.trust_policy, "");
}

#[tokio::test(start_paused = true)]
async fn test_read_reports_remote_error() {
    let service = Arc::new(ScriptedService::succeeding().with_read_error("access denied"));
    let err = reconciler(&service)
        .read("web", NameSource::Explicit)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "reading role \"web\": access denied"
    );
}

#[test]
fn test_reconciler_rejects_invalid_provider() {
    let provider = ProviderConfig {
        retry: RetryPolicy::new(Duration::ZERO, Duration::from_secs(1)),
        ..provider()
    };
    let service = Arc::new(ScriptedService::succeeding());
    assert!(matches!(
        Reconciler::new(provider, service),
        Err(RoleError::Validation(_))
    ));
}
