//! Tenant identity
//!
//! A tenant is the isolation boundary every stored record belongs to.
//! The context is created once at the request boundary and passed
//! explicitly to the dispatcher; there is no ambient fallback.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant that owns demo seed data
pub const DEFAULT_TENANT_ID: TenantId =
    TenantId(Uuid::from_u128(0x3e802e65_916e_4f2c_8068_abdd3b93dc2c));

/// Unique identifier for a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Uuid::parse_str(s.trim()).map_err(|_| format!("Invalid tenant id: {}", s))?;
        if id.is_nil() {
            return Err("Tenant id must not be nil".to_string());
        }
        Ok(Self(id))
    }
}

/// Request-scoped tenant context
///
/// Holding a `TenantContext` is proof that the tenant was resolved; every
/// store session requires one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_parses_uuid() {
        let id: TenantId = "3e802e65-916e-4f2c-8068-abdd3b93dc2c".parse().unwrap();
        assert_eq!(id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn tenant_id_trims_whitespace() {
        let id: TenantId = "  3e802e65-916e-4f2c-8068-abdd3b93dc2c ".parse().unwrap();
        assert_eq!(id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn tenant_id_rejects_garbage() {
        assert!("acme".parse::<TenantId>().is_err());
        assert!("".parse::<TenantId>().is_err());
    }

    #[test]
    fn tenant_id_rejects_nil() {
        assert!("00000000-0000-0000-0000-000000000000"
            .parse::<TenantId>()
            .is_err());
    }

    #[test]
    fn context_exposes_tenant() {
        let ctx = TenantContext::new(DEFAULT_TENANT_ID);
        assert_eq!(ctx.tenant_id(), DEFAULT_TENANT_ID);
    }
}
