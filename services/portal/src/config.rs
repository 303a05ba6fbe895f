use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use wwky_access::{AccessRule, AccessRuleTable, PolicyId, RoleId, RuleMatch};

pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_VIEW_CAPACITY: usize = 256;

// Portal gateway configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub cms_url: String,
    pub cms_token: Option<String>,
    pub feed_url: String,
    pub upstream_timeout_ms: u64,
    pub view_capacity: usize,
    pub role_ids: RoleIds,
    pub policy_ids: PolicyIds,
    pub rules: Vec<RuleSpec>,
}

/// Role ids as the identity service mints them, keyed by the symbolic names
/// the rule specs use. Unset entries leave their symbol unresolvable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleIds {
    pub dev_admin: Option<String>,
    pub wwky_admin: Option<String>,
    pub standard: Option<String>,
}

impl RoleIds {
    fn lookup(&self, name: &str) -> Option<Option<&str>> {
        match name {
            "dev_admin" => Some(self.dev_admin.as_deref()),
            "wwky_admin" => Some(self.wwky_admin.as_deref()),
            "standard" => Some(self.standard.as_deref()),
            _ => None,
        }
    }
}

/// Policy ids, same scheme as [`RoleIds`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyIds {
    pub full_admin: Option<String>,
    pub wwky_admin: Option<String>,
    pub hub: Option<String>,
    pub trainer: Option<String>,
    pub leader: Option<String>,
    pub sampler: Option<String>,
}

impl PolicyIds {
    fn lookup(&self, name: &str) -> Option<Option<&str>> {
        match name {
            "full_admin" => Some(self.full_admin.as_deref()),
            "wwky_admin" => Some(self.wwky_admin.as_deref()),
            "hub" => Some(self.hub.as_deref()),
            "trainer" => Some(self.trainer.as_deref()),
            "leader" => Some(self.leader.as_deref()),
            "sampler" => Some(self.sampler.as_deref()),
            _ => None,
        }
    }
}

/// One rule as configured: the path plus symbolic role/policy names that are
/// resolved to real ids when the table is built.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub path: String,
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub policies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PortalConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    cms_url: Option<String>,
    cms_token: Option<String>,
    feed_url: Option<String>,
    upstream_timeout_ms: Option<u64>,
    view_capacity: Option<usize>,
    role_ids: Option<RoleIds>,
    policy_ids: Option<PolicyIds>,
    rules: Option<Vec<RuleSpec>>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("WWKY_PORTAL_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8090".to_string())
            .parse()
            .with_context(|| "parse WWKY_PORTAL_BIND")?;
        let metrics_bind = std::env::var("WWKY_PORTAL_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8091".to_string())
            .parse()
            .with_context(|| "parse WWKY_PORTAL_METRICS_BIND")?;
        let cms_url = std::env::var("WWKY_PORTAL_CMS_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8055".to_string());
        let cms_token = std::env::var("WWKY_PORTAL_CMS_TOKEN").ok();
        let feed_url = std::env::var("WWKY_PORTAL_FEED_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8070/wwky-data".to_string());
        let upstream_timeout_ms = std::env::var("WWKY_PORTAL_UPSTREAM_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_TIMEOUT_MS.to_string())
            .parse()
            .with_context(|| "parse WWKY_PORTAL_UPSTREAM_TIMEOUT_MS")?;
        let view_capacity = std::env::var("WWKY_PORTAL_VIEW_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_VIEW_CAPACITY.to_string())
            .parse()
            .with_context(|| "parse WWKY_PORTAL_VIEW_CAPACITY")?;
        let role_ids = RoleIds {
            dev_admin: std::env::var("WWKY_DEVADMIN_ROLE_ID").ok(),
            wwky_admin: std::env::var("WWKY_WWKYADMIN_ROLE_ID").ok(),
            standard: std::env::var("WWKY_STANDARD_ROLE_ID").ok(),
        };
        let policy_ids = PolicyIds {
            full_admin: std::env::var("WWKY_FULLADMIN_POLICY_ID").ok(),
            wwky_admin: std::env::var("WWKY_WWKYADMIN_POLICY_ID").ok(),
            hub: std::env::var("WWKY_HUB_POLICY_ID").ok(),
            trainer: std::env::var("WWKY_TRAINER_POLICY_ID").ok(),
            leader: std::env::var("WWKY_LEADER_POLICY_ID").ok(),
            sampler: std::env::var("WWKY_SAMPLER_POLICY_ID").ok(),
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            cms_url,
            cms_token,
            feed_url,
            upstream_timeout_ms,
            view_capacity,
            role_ids,
            policy_ids,
            rules: default_rule_specs(),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("WWKY_PORTAL_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read WWKY_PORTAL_CONFIG: {path}"))?;
            let override_cfg: PortalConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse portal config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.cms_url {
                config.cms_url = value;
            }
            if let Some(value) = override_cfg.cms_token {
                config.cms_token = Some(value);
            }
            if let Some(value) = override_cfg.feed_url {
                config.feed_url = value;
            }
            if let Some(value) = override_cfg.upstream_timeout_ms {
                config.upstream_timeout_ms = value;
            }
            if let Some(value) = override_cfg.view_capacity {
                config.view_capacity = value;
            }
            if let Some(value) = override_cfg.role_ids {
                config.role_ids = value;
            }
            if let Some(value) = override_cfg.policy_ids {
                config.policy_ids = value;
            }
            if let Some(value) = override_cfg.rules {
                config.rules = value;
            }
        }
        Ok(config)
    }

    /// Resolve the configured rule specs into the runtime table.
    ///
    /// A known symbol without a configured id stays in the rule as the bare
    /// symbol. Real ids are opaque strings from the identity service, so the
    /// symbol can never equal one and that branch of the rule is
    /// unsatisfiable; the miss is logged once here at build time. Strings
    /// that are not known symbols pass through as literal ids.
    pub fn build_rule_table(&self) -> AccessRuleTable {
        let rules = self
            .rules
            .iter()
            .map(|spec| AccessRule {
                path: spec.path.clone(),
                matching: if spec.exact {
                    RuleMatch::Exact
                } else {
                    RuleMatch::Prefix
                },
                roles: spec
                    .roles
                    .iter()
                    .map(|name| RoleId::new(self.resolve_role(name)))
                    .collect(),
                policies: spec
                    .policies
                    .iter()
                    .map(|name| PolicyId::new(self.resolve_policy(name)))
                    .collect(),
            })
            .collect();
        AccessRuleTable::new(rules)
    }

    fn resolve_role(&self, name: &str) -> String {
        match self.role_ids.lookup(name) {
            Some(Some(id)) => id.to_string(),
            Some(None) => {
                tracing::warn!(symbol = name, "role id not configured; rule keeps the symbol");
                name.to_string()
            }
            None => name.to_string(),
        }
    }

    fn resolve_policy(&self, name: &str) -> String {
        match self.policy_ids.lookup(name) {
            Some(Some(id)) => id.to_string(),
            Some(None) => {
                tracing::warn!(
                    symbol = name,
                    "policy id not configured; rule keeps the symbol"
                );
                name.to_string()
            }
            None => name.to_string(),
        }
    }
}

/// The portal's route families. Order is load-bearing: every rule matches by
/// prefix and only the first match governs, so child paths precede their
/// parents.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    const ADMIN_ROLES: &[&str] = &["dev_admin", "wwky_admin"];
    vec![
        rule(
            "/portal/leader/hub-manager-invite",
            ADMIN_ROLES,
            &["full_admin", "wwky_admin", "leader"],
        ),
        rule(
            "/portal/users",
            ADMIN_ROLES,
            &["full_admin", "wwky_admin", "leader"],
        ),
        rule("/portal/train/report", ADMIN_ROLES, &["full_admin", "trainer"]),
        rule("/portal/train", ADMIN_ROLES, &["full_admin", "trainer"]),
        rule(
            "/portal/hub/hub-add",
            ADMIN_ROLES,
            &["full_admin", "hub", "leader"],
        ),
        rule(
            "/portal/hub/hub-samplers",
            ADMIN_ROLES,
            &["full_admin", "hub", "leader"],
        ),
        // No policy list here: the standard role gates the page in practice,
        // and the empty policy side waves everyone through.
        rule("/portal/hub", &["dev_admin", "wwky_admin", "standard"], &[]),
        rule("/portal/sample", ADMIN_ROLES, &["full_admin", "sampler"]),
        rule("/portal/biological", ADMIN_ROLES, &["full_admin"]),
        rule("/portal/habitat", ADMIN_ROLES, &["full_admin"]),
        rule("/unauthorized", &[], &[]),
    ]
}

fn rule(path: &str, roles: &[&str], policies: &[&str]) -> RuleSpec {
    RuleSpec {
        path: path.to_string(),
        exact: false,
        roles: roles.iter().map(|name| name.to_string()).collect(),
        policies: policies.iter().map(|name| name.to_string()).collect(),
    }
}
