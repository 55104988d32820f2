//! Entity template registry
//!
//! Maps each logical business entity to the schema description and tenant
//! scoping instructions used to build the SQL synthesis prompt. Template
//! bodies are process-wide, read-only configuration; `lookup` interpolates
//! the caller's tenant values into a fresh template per request.

use crate::tenant::TenantContext;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// The six logical entities this pipeline can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    Contracts,
    Isrc,
    Virgin,
    Releases,
    Distribution,
    TuStreams,
}

impl EntityKey {
    pub const ALL: [EntityKey; 6] = [
        EntityKey::Contracts,
        EntityKey::Isrc,
        EntityKey::Virgin,
        EntityKey::Releases,
        EntityKey::Distribution,
        EntityKey::TuStreams,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKey::Contracts => "Contracts",
            EntityKey::Isrc => "Isrc",
            EntityKey::Virgin => "Virgin",
            EntityKey::Releases => "Releases",
            EntityKey::Distribution => "Distribution",
            EntityKey::TuStreams => "TuStreams",
        }
    }

    /// Relation name the entity's rows live in. Quoted CamelCase on the
    /// database side, so generated SQL must double-quote it.
    pub fn table_name(&self) -> &'static str {
        self.as_str()
    }

    /// Resolve a raw caller-supplied key. Unknown keys fall back to the
    /// default entity; the fallback is logged so it stays observable.
    pub fn parse(raw: &str) -> EntityKey {
        match raw {
            "Contracts" => EntityKey::Contracts,
            "Isrc" => EntityKey::Isrc,
            "Virgin" => EntityKey::Virgin,
            "Releases" => EntityKey::Releases,
            "Distribution" => EntityKey::Distribution,
            "TuStreams" => EntityKey::TuStreams,
            other => {
                warn!(raw_key = other, "Unknown entity key, falling back to Contracts");
                EntityKey::Contracts
            }
        }
    }
}

/// Schema template for one entity, tenant values already interpolated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTemplate {
    pub key: EntityKey,
    pub table_name: String,
    pub schema_description: String,
    pub tenant_filter_instructions: String,
}

const CONTRACTS_SCHEMA: &str = r#"Table "Contracts" holds distribution contracts, one row per signed contract.
Columns:
  "id" uuid - administrative, never select it
  "userId" integer - owner of the row (tenant scoping)
  "teamId" integer, nullable - owning team (tenant scoping)
  "folderId" text, nullable - workspace folder (tenant scoping)
  "artistName" text - contracted artist or band
  "contractType" text - one of 'exclusive', 'non-exclusive', 'licensing'
  "status" text - one of 'draft', 'active', 'expired', 'terminated'
  "startDate" date - contract start
  "endDate" date, nullable - contract end
  "royaltyRate" numeric - artist share in percent
  "advance" numeric - advance payment in EUR
  "territory" text - ISO region code or 'worldwide'
  "createdAt" timestamptz - administrative, never select it"#;

const ISRC_SCHEMA: &str = r#"Table "Isrc" is the registry of ISRC codes assigned to recorded tracks.
Columns:
  "id" uuid - administrative, never select it
  "userId" integer - owner of the row (tenant scoping)
  "teamId" integer, nullable - owning team (tenant scoping)
  "folderId" text, nullable - workspace folder (tenant scoping)
  "isrc" text - the 12-character ISRC code
  "trackTitle" text - recording title
  "artistName" text - main performing artist
  "duration" integer - track length in seconds
  "releaseDate" date, nullable - first release of the recording
  "label" text - issuing label name
  "createdAt" timestamptz - administrative, never select it"#;

const VIRGIN_SCHEMA: &str = r#"Table "Virgin" holds monthly royalty statement lines imported from the Virgin sales feed.
Columns:
  "id" uuid - administrative, never select it
  "userId" integer - owner of the row (tenant scoping)
  "teamId" integer, nullable - owning team (tenant scoping)
  "folderId" text, nullable - workspace folder (tenant scoping)
  "reportMonth" date - first day of the reported month
  "artistName" text - performing artist
  "trackTitle" text - reported track
  "store" text - retail platform, e.g. 'Spotify', 'Apple Music'
  "territory" text - ISO country code of the sale
  "units" integer - streamed or sold units
  "revenue" numeric - net receipts in EUR
  "createdAt" timestamptz - administrative, never select it"#;

const RELEASES_SCHEMA: &str = r#"Table "Releases" holds the catalog of releases (albums, EPs, singles).
Columns:
  "id" uuid - administrative, never select it
  "userId" integer - owner of the row (tenant scoping)
  "teamId" integer, nullable - owning team (tenant scoping)
  "folderId" text, nullable - workspace folder (tenant scoping)
  "title" text - release title
  "artistName" text - main artist
  "releaseType" text - one of 'album', 'ep', 'single', 'compilation'
  "releaseDate" date - street date
  "upc" text - barcode of the release
  "status" text - one of 'draft', 'submitted', 'live', 'taken-down'
  "label" text - releasing label
  "createdAt" timestamptz - administrative, never select it"#;

const DISTRIBUTION_SCHEMA: &str = r#"Table "Distribution" tracks delivery of releases to retail platforms, one row per release and platform.
Columns:
  "id" uuid - administrative, never select it
  "userId" integer - owner of the row (tenant scoping)
  "teamId" integer, nullable - owning team (tenant scoping)
  "folderId" text, nullable - workspace folder (tenant scoping)
  "releaseTitle" text - distributed release
  "platform" text - target store, e.g. 'Spotify', 'Deezer', 'TikTok'
  "deliveryStatus" text - one of 'queued', 'delivered', 'failed', 'withdrawn'
  "deliveredAt" timestamptz, nullable - completion time of the delivery
  "territory" text - ISO region code or 'worldwide'
  "createdAt" timestamptz - administrative, never select it"#;

const TU_STREAMS_SCHEMA: &str = r#"Table "TuStreams" holds aggregated streaming statistics per track, platform and period.
Columns:
  "id" uuid - administrative, never select it
  "userId" integer - owner of the row (tenant scoping)
  "teamId" integer, nullable - owning team (tenant scoping)
  "folderId" text, nullable - workspace folder (tenant scoping)
  "trackTitle" text - streamed track
  "artistName" text - performing artist
  "platform" text - streaming platform
  "periodStart" date - first day of the aggregation window
  "periodEnd" date - last day of the aggregation window
  "streams" bigint - stream count in the window
  "revenue" numeric - estimated receipts in EUR
  "createdAt" timestamptz - administrative, never select it"#;

lazy_static! {
    static ref SCHEMAS: HashMap<EntityKey, &'static str> = {
        let mut m = HashMap::new();
        m.insert(EntityKey::Contracts, CONTRACTS_SCHEMA);
        m.insert(EntityKey::Isrc, ISRC_SCHEMA);
        m.insert(EntityKey::Virgin, VIRGIN_SCHEMA);
        m.insert(EntityKey::Releases, RELEASES_SCHEMA);
        m.insert(EntityKey::Distribution, DISTRIBUTION_SCHEMA);
        m.insert(EntityKey::TuStreams, TU_STREAMS_SCHEMA);
        m
    };
}

/// Static lookup over the six known entities.
pub struct TemplateRegistry;

impl TemplateRegistry {
    /// Return the template for `key` with the literal tenant values
    /// interpolated into the scoping instructions.
    pub fn lookup(key: EntityKey, tenant: &TenantContext) -> EntityTemplate {
        let schema = SCHEMAS
            .get(&key)
            .copied()
            .unwrap_or(CONTRACTS_SCHEMA);

        EntityTemplate {
            key,
            table_name: key.table_name().to_string(),
            schema_description: schema.to_string(),
            tenant_filter_instructions: tenant_filter_instructions(key.table_name(), tenant),
        }
    }
}

/// Build the tenant scoping paragraph for the synthesis prompt.
///
/// The statement is instructed, not mechanically forced, to respect the
/// tenant partition; the pipeline checks compliance after acceptance and
/// logs when the predicate is absent.
fn tenant_filter_instructions(table: &str, tenant: &TenantContext) -> String {
    let mut lines = vec![format!(
        "Every row in \"{}\" belongs to a tenant. The calling user id is {} (team id: {}, folder id: {}).",
        table,
        tenant.user_id,
        tenant.team_literal(),
        tenant.folder_literal()
    )];

    match tenant.team_id {
        Some(team_id) => lines.push(format!(
            "The statement MUST restrict rows to this tenant: include WHERE (\"userId\" = {} OR \"teamId\" = {}) in every query.",
            tenant.user_id, team_id
        )),
        None => lines.push(format!(
            "The statement MUST restrict rows to this tenant: include WHERE \"userId\" = {} in every query.",
            tenant.user_id
        )),
    }

    if let Some(folder_id) = &tenant.folder_id {
        lines.push(format!(
            "Additionally restrict to the selected folder: AND \"folderId\" = '{}'.",
            folder_id.replace('\'', "''")
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_embeds_user_id() {
        let tenant = TenantContext::new(42);
        for key in EntityKey::ALL {
            let template = TemplateRegistry::lookup(key, &tenant);
            assert!(
                template.tenant_filter_instructions.contains("42"),
                "template for {:?} does not embed the user id",
                key
            );
            assert_eq!(template.table_name, key.table_name());
        }
    }

    #[test]
    fn test_template_embeds_team_id_when_present() {
        let tenant = TenantContext::new(5).with_team(77);
        for key in EntityKey::ALL {
            let template = TemplateRegistry::lookup(key, &tenant);
            assert!(template.tenant_filter_instructions.contains("77"));
            assert!(template.tenant_filter_instructions.contains("\"teamId\""));
        }
    }

    #[test]
    fn test_template_embeds_folder_when_present() {
        let tenant = TenantContext::new(5).with_folder("f-123");
        let template = TemplateRegistry::lookup(EntityKey::Releases, &tenant);
        assert!(template.tenant_filter_instructions.contains("'f-123'"));
    }

    #[test]
    fn test_unknown_key_falls_back_to_contracts() {
        assert_eq!(EntityKey::parse("Unicorns"), EntityKey::Contracts);
        assert_eq!(EntityKey::parse("TuStreams"), EntityKey::TuStreams);
    }

    #[test]
    fn test_schema_marks_administrative_columns() {
        let tenant = TenantContext::new(1);
        let template = TemplateRegistry::lookup(EntityKey::Virgin, &tenant);
        assert!(template.schema_description.contains("never select it"));
    }
}
