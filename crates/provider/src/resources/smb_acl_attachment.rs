//! SMB ACL attachment resource handler

use alinas_common::{Error, Result, SmbAclAttachmentId};
use base64::Engine;
use tracing::{debug, info};

use super::{Resource, ResourceContext};
use crate::client::RequestParams;
use crate::schema::{self, Diagnostic, Schema, SMB_ACL_ATTACHMENT_TYPE};
use crate::service::{self, value_to_bool, value_to_string, NAS_NOT_FOUND};
use crate::state::{
    bool_value, get_bool_attr, get_optional_string_attr, get_string_attr, make_state,
    string_value, DynamicValue,
};

pub struct SmbAclAttachmentResource;

/// Attributes sent with ModifySmbAcl
const MODIFIABLE_ATTRS: &[&str] = &[
    "keytab",
    "keytab_md5",
    "enable_anonymous_access",
    "encrypt_data",
    "reject_unencrypted_access",
    "super_admin_sid",
    "home_dir_path",
];

/// Settings EnableSmbAcl does not accept
const POST_ENABLE_ATTRS: &[&str] = &[
    "enable_anonymous_access",
    "encrypt_data",
    "reject_unencrypted_access",
    "super_admin_sid",
    "home_dir_path",
];

fn state_id(state: &DynamicValue) -> Result<SmbAclAttachmentId> {
    state
        .id()
        .ok_or_else(|| Error::Internal(format!("{} state has no id", SMB_ACL_ATTACHMENT_TYPE)))?
        .parse()
}

fn modify_params(ctx: &ResourceContext<'_>, file_system_id: &str, config: &DynamicValue) -> RequestParams {
    let mut params = RequestParams::new();
    params
        .insert("RegionId", ctx.region())
        .insert("FileSystemId", file_system_id)
        .insert("Keytab", get_string_attr(config, "keytab"))
        .insert("KeytabMd5", get_string_attr(config, "keytab_md5"))
        .insert_bool(
            "EnableAnonymousAccess",
            get_bool_attr(config, "enable_anonymous_access", false),
        )
        .insert_bool("EncryptData", get_bool_attr(config, "encrypt_data", false))
        .insert_bool(
            "RejectUnencryptedAccess",
            get_bool_attr(config, "reject_unencrypted_access", false),
        )
        .insert("SuperAdminSid", get_string_attr(config, "super_admin_sid"))
        .insert("HomeDirPath", get_string_attr(config, "home_dir_path"));
    params
}

async fn modify(ctx: &ResourceContext<'_>, file_system_id: &str, config: &DynamicValue) -> Result<()> {
    let params = modify_params(ctx, file_system_id, config);
    ctx.call("ModifySmbAcl", &params, ctx.timeouts.update()).await?;
    Ok(())
}

#[async_trait::async_trait]
impl Resource for SmbAclAttachmentResource {
    fn type_name() -> &'static str {
        SMB_ACL_ATTACHMENT_TYPE
    }

    fn schema() -> Schema {
        schema::smb_acl_attachment_schema()
    }

    fn validate(config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diags = Self::schema().validate(config);
        if let Some(keytab) = get_optional_string_attr(config, "keytab") {
            if base64::engine::general_purpose::STANDARD
                .decode(keytab.trim())
                .is_err()
            {
                diags.push(
                    Diagnostic::warning(
                        "Keytab is not base64",
                        "the API expects the keytab file content encoded as base64",
                    )
                    .at("keytab"),
                );
            }
        }
        diags
    }

    async fn create(ctx: &ResourceContext<'_>, config: &DynamicValue) -> Result<DynamicValue> {
        let id = SmbAclAttachmentId::new(
            get_string_attr(config, "file_system_id"),
            get_string_attr(config, "keytab"),
            get_string_attr(config, "keytab_md5"),
        );

        let mut params = RequestParams::new();
        params
            .insert("RegionId", ctx.region())
            .insert("FileSystemId", id.file_system_id.as_str())
            .insert("Keytab", id.keytab.as_str())
            .insert("KeytabMd5", id.keytab_md5.as_str());
        ctx.call("EnableSmbAcl", &params, ctx.timeouts.create()).await?;
        info!(file_system_id = %id.file_system_id, "Enabled SMB ACL");

        let has_settings = POST_ENABLE_ATTRS
            .iter()
            .any(|attr| config.get(attr).map_or(false, |v| !v.is_null()));
        if has_settings {
            modify(ctx, &id.file_system_id, config).await?;
            debug!(file_system_id = %id.file_system_id, "Applied SMB ACL settings after enable");
        }

        let created = make_state(vec![("id", string_value(id.to_string()))]);
        Self::read(ctx, &created)
            .await?
            .ok_or_else(|| Error::not_found("Nas:SmbAcl", id.file_system_id.clone()))
    }

    async fn read(ctx: &ResourceContext<'_>, state: &DynamicValue) -> Result<Option<DynamicValue>> {
        let id = state_id(state)?;

        let acl = match service::describe_smb_acl(
            ctx.api,
            ctx.retry,
            ctx.timeouts.read(),
            &id.file_system_id,
        )
        .await
        {
            Ok(acl) => acl,
            Err(e) if e.is_not_found() => {
                debug!(
                    file_system_id = %id.file_system_id,
                    "Resource {} describe failed, removing from state: {}",
                    SMB_ACL_ATTACHMENT_TYPE,
                    e
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let flag = |key: &str| bool_value(value_to_bool(acl.get(key)).unwrap_or(false));
        let text = |key: &str| string_value(value_to_string(acl.get(key)));

        Ok(Some(make_state(vec![
            ("id", string_value(id.to_string())),
            ("file_system_id", string_value(&id.file_system_id)),
            ("keytab", string_value(&id.keytab)),
            ("keytab_md5", string_value(&id.keytab_md5)),
            ("auth_method", text("AuthMethod")),
            ("enable_anonymous_access", flag("EnableAnonymousAccess")),
            ("encrypt_data", flag("EncryptData")),
            ("reject_unencrypted_access", flag("RejectUnencryptedAccess")),
            ("super_admin_sid", text("SuperAdminSid")),
            ("home_dir_path", text("HomeDirPath")),
            ("enabled", text("Enabled")),
        ])))
    }

    async fn update(
        ctx: &ResourceContext<'_>,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = state_id(state)?;
        let schema = Self::schema();

        let changed: Vec<&str> = MODIFIABLE_ATTRS
            .iter()
            .copied()
            .filter(|attr| schema.has_change(state, config, attr))
            .collect();

        let mut current = id.clone();
        if !changed.is_empty() {
            modify(ctx, &id.file_system_id, config).await?;
            info!(file_system_id = %id.file_system_id, changed = ?changed, "Modified SMB ACL");

            // The keytab is part of the id, so a rotated keytab moves it.
            current.keytab = get_string_attr(config, "keytab");
            current.keytab_md5 = get_string_attr(config, "keytab_md5");
        }

        let addressed = make_state(vec![("id", string_value(current.to_string()))]);
        Self::read(ctx, &addressed)
            .await?
            .ok_or_else(|| Error::not_found("Nas:SmbAcl", id.file_system_id.clone()))
    }

    async fn delete(ctx: &ResourceContext<'_>, state: &DynamicValue) -> Result<()> {
        let id = state_id(state)?;

        let mut params = RequestParams::new();
        params
            .insert("RegionId", ctx.region())
            .insert("FileSystemId", id.file_system_id.as_str());

        match ctx.call("DisableSmbAcl", &params, ctx.timeouts.delete()).await {
            Ok(_) => {
                info!(file_system_id = %id.file_system_id, "Disabled SMB ACL");
                Ok(())
            }
            Err(e) if e.is_expected(NAS_NOT_FOUND) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, Timeouts};
    use crate::testing::FakeNas;
    use serde_json::json;

    const KEYTAB: &str = "BQIAAABHAAEADUFMSUZFQ0xPVUQuQ09N";

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            first_wait_ms: 1,
            increment_ms: 1,
            max_wait_ms: 2,
        }
    }

    fn describe_acl(fake: &FakeNas) {
        fake.respond(
            "DescribeSmbAcl",
            json!({"RequestId": "r", "Acl": {
                "Enabled": true,
                "AuthMethod": "krb5",
                "EnableAnonymousAccess": false,
                "EncryptData": "true",
                "RejectUnencryptedAccess": false,
                "SuperAdminSid": "S-1-5-21-1",
                "HomeDirPath": "\\home"
            }}),
        );
    }

    fn config() -> DynamicValue {
        make_state(vec![
            ("file_system_id", string_value("31a8e4****")),
            ("keytab", string_value(KEYTAB)),
            ("keytab_md5", string_value("E3CCF7E2416DF04FA958AA4513EA29E8")),
        ])
    }

    #[tokio::test]
    async fn test_create_enables_acl() {
        let fake = FakeNas::new();
        describe_acl(&fake);
        let (timeouts, retry) = (Timeouts::default(), fast_retry());
        let ctx = ResourceContext::new(&fake, &timeouts, &retry);

        let state = SmbAclAttachmentResource::create(&ctx, &config()).await.unwrap();

        assert_eq!(
            state.id().unwrap(),
            format!("31a8e4****:{}:E3CCF7E2416DF04FA958AA4513EA29E8", KEYTAB)
        );
        assert_eq!(get_string_attr(&state, "enabled"), "true");
        assert_eq!(get_string_attr(&state, "auth_method"), "krb5");
        assert!(get_bool_attr(&state, "encrypt_data", false));
        assert_eq!(get_string_attr(&state, "home_dir_path"), "\\home");
        assert_eq!(fake.actions(), vec!["EnableSmbAcl", "DescribeSmbAcl"]);

        let params = fake.last_params("EnableSmbAcl").unwrap();
        assert_eq!(params.get("Keytab"), Some(KEYTAB));
        assert!(!params.contains("EncryptData"));
    }

    #[tokio::test]
    async fn test_create_applies_settings() {
        let fake = FakeNas::new();
        describe_acl(&fake);
        let (timeouts, retry) = (Timeouts::default(), fast_retry());
        let ctx = ResourceContext::new(&fake, &timeouts, &retry);

        let mut cfg = config();
        cfg.set("encrypt_data", bool_value(true));
        SmbAclAttachmentResource::create(&ctx, &cfg).await.unwrap();

        assert_eq!(
            fake.actions(),
            vec!["EnableSmbAcl", "ModifySmbAcl", "DescribeSmbAcl"]
        );
        let params = fake.last_params("ModifySmbAcl").unwrap();
        assert_eq!(params.get("EncryptData"), Some("true"));
        assert_eq!(params.get("EnableAnonymousAccess"), Some("false"));
    }

    #[tokio::test]
    async fn test_update_rotates_keytab_in_id() {
        let fake = FakeNas::new();
        describe_acl(&fake);
        let (timeouts, retry) = (Timeouts::default(), fast_retry());
        let ctx = ResourceContext::new(&fake, &timeouts, &retry);

        let prior = SmbAclAttachmentResource::read(
            &ctx,
            &make_state(vec![(
                "id",
                string_value(format!("31a8e4****:{}:OLDMD5", KEYTAB)),
            )]),
        )
        .await
        .unwrap()
        .unwrap();

        let mut planned = prior.clone();
        planned.set("keytab_md5", string_value("NEWMD5"));
        let state = SmbAclAttachmentResource::update(&ctx, &prior, &planned)
            .await
            .unwrap();

        assert_eq!(get_string_attr(&state, "keytab_md5"), "NEWMD5");
        let params = fake.last_params("ModifySmbAcl").unwrap();
        assert_eq!(params.get("KeytabMd5"), Some("NEWMD5"));
        assert_eq!(params.get("SuperAdminSid"), Some("S-1-5-21-1"));
    }

    #[tokio::test]
    async fn test_update_clears_admin_sid_and_home_dir() {
        let fake = FakeNas::new();
        describe_acl(&fake);
        let (timeouts, retry) = (Timeouts::default(), fast_retry());
        let ctx = ResourceContext::new(&fake, &timeouts, &retry);

        let prior = SmbAclAttachmentResource::read(
            &ctx,
            &make_state(vec![("id", string_value(format!("fs-1:{}:MD5", KEYTAB)))]),
        )
        .await
        .unwrap()
        .unwrap();

        let mut planned = prior.clone();
        planned.set("super_admin_sid", DynamicValue::Null);
        planned.set("home_dir_path", string_value(""));
        SmbAclAttachmentResource::update(&ctx, &prior, &planned)
            .await
            .unwrap();

        let params = fake.last_params("ModifySmbAcl").unwrap();
        assert_eq!(params.get("SuperAdminSid"), Some(""));
        assert_eq!(params.get("HomeDirPath"), Some(""));
    }

    #[tokio::test]
    async fn test_update_without_changes_skips_modify() {
        let fake = FakeNas::new();
        describe_acl(&fake);
        let (timeouts, retry) = (Timeouts::default(), fast_retry());
        let ctx = ResourceContext::new(&fake, &timeouts, &retry);

        let prior = SmbAclAttachmentResource::read(
            &ctx,
            &make_state(vec![("id", string_value(format!("fs-1:{}:MD5", KEYTAB)))]),
        )
        .await
        .unwrap()
        .unwrap();
        SmbAclAttachmentResource::update(&ctx, &prior, &prior).await.unwrap();
        assert_eq!(fake.calls("ModifySmbAcl"), 0);
    }

    #[tokio::test]
    async fn test_read_and_delete_missing_file_system() {
        let fake = FakeNas::new();
        fake.fail("DescribeSmbAcl", 404, "Forbidden.NasNotFound");
        fake.fail("DisableSmbAcl", 404, "Forbidden.NasNotFound");
        let (timeouts, retry) = (Timeouts::default(), fast_retry());
        let ctx = ResourceContext::new(&fake, &timeouts, &retry);
        let state = make_state(vec![("id", string_value(format!("fs-1:{}:MD5", KEYTAB)))]);

        assert!(SmbAclAttachmentResource::read(&ctx, &state).await.unwrap().is_none());
        SmbAclAttachmentResource::delete(&ctx, &state).await.unwrap();
        assert_eq!(
            fake.last_params("DisableSmbAcl").unwrap().get("FileSystemId"),
            Some("fs-1")
        );
    }

    #[test]
    fn test_validate_warns_on_non_base64_keytab() {
        let mut cfg = config();
        assert!(SmbAclAttachmentResource::validate(&cfg).is_empty());

        cfg.set("keytab", string_value("not base64!"));
        let diags = SmbAclAttachmentResource::validate(&cfg);
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
    }
}
