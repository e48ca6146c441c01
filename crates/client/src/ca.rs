// Path: crates/client/src/ca.rs
//! Certificate authority REST client: enrollment and identity administration.
//!
//! Enrollment authenticates with the enrollment secret over basic auth. Every
//! other call carries a token signed by an already enrolled identity:
//! `base64(cert) "." base64(sig(base64(body) "." base64(cert)))`.

use crate::context::ClientContext;
use crate::identity::SigningIdentity;
use crate::normalize::{run, OperationError};
use crate::rest::RestClient;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stitch_crypto::der::san::GeneralName;
use stitch_crypto::sign::ecdsa::export_private_pem;
use stitch_crypto::sign::x509::build_csr;
use stitch_crypto::{Curve, PrivateKeyHandle};
use stitch_types::config::RpcKind;
use stitch_types::error::{
    ConfigError, CryptoError, LedgerError, SdkError, TransportError, ValidationError,
};
use stitch_types::prelude::non_empty;

/// Builds the authorization token for a CA request body.
pub fn auth_token(identity: &SigningIdentity, body: &[u8]) -> Result<String, CryptoError> {
    let cert = STANDARD.encode(identity.cert_pem());
    let message = format!("{}.{cert}", STANDARD.encode(body));
    let signature = identity.sign(message.as_bytes())?;
    Ok(format!("{cert}.{}", STANDARD.encode(signature)))
}

/// The envelope every CA endpoint answers with.
#[derive(Debug, Deserialize)]
struct CaResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    errors: Vec<CaMessage>,
}

#[derive(Debug, Deserialize)]
struct CaMessage {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Unwraps a CA answer into its typed `result`.
fn parse_response<T: DeserializeOwned>(url: &str, status: u16, body: &str) -> Result<T, SdkError> {
    let Ok(envelope) = serde_json::from_str::<CaResponse>(body) else {
        if !(200..300).contains(&status) {
            return Err(TransportError::Http {
                url: url.to_string(),
                status,
                message: body.to_string(),
            }
            .into());
        }
        return Err(LedgerError::Decode(format!("unexpected CA response from {url}")).into());
    };
    if let Some(first) = envelope.errors.first() {
        return Err(LedgerError::Authority {
            code: first.code,
            message: first.message.clone(),
        }
        .into());
    }
    if !envelope.success || !(200..300).contains(&status) {
        return Err(TransportError::Http {
            url: url.to_string(),
            status,
            message: body.to_string(),
        }
        .into());
    }
    serde_json::from_value(envelope.result)
        .map_err(|e| LedgerError::Decode(format!("CA result from {url}: {e}")).into())
}

/// An attribute attached to a registered identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, e.g. `hf.Registrar.Roles`.
    pub name: String,
    /// Attribute value.
    pub value: String,
    /// Whether enrollment certificates carry the attribute by default.
    #[serde(default)]
    pub ecert: bool,
}

/// A new identity for the CA to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    /// The name the identity enrolls with.
    #[serde(rename = "id")]
    pub enrollment_id: String,
    /// `client`, `peer`, `orderer` or `admin`.
    #[serde(rename = "type")]
    pub identity_type: String,
    /// The enrollment secret; the CA generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Dotted affiliation path, e.g. `org1.department1`.
    pub affiliation: String,
    /// `-1` for unlimited, `0` for the server default.
    pub max_enrollments: i32,
    /// Attributes to attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<Attribute>,
}

impl RegistrationRequest {
    /// A `client` identity with server-default enrollments and no attributes.
    pub fn client(enrollment_id: impl Into<String>, affiliation: impl Into<String>) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            identity_type: "client".into(),
            secret: None,
            affiliation: affiliation.into(),
            max_enrollments: 0,
            attrs: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistrationResult {
    secret: String,
}

/// An identity as the CA stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInfo {
    /// The enrollment id.
    pub id: String,
    /// `client`, `peer`, `orderer` or `admin`.
    #[serde(rename = "type", default)]
    pub identity_type: String,
    /// Dotted affiliation path.
    #[serde(default)]
    pub affiliation: String,
    /// Remaining enrollments; `-1` for unlimited.
    #[serde(default)]
    pub max_enrollments: i32,
    /// Registered attributes.
    #[serde(default)]
    pub attrs: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
struct IdentityList {
    #[serde(default)]
    identities: Vec<IdentityInfo>,
}

/// A node of the CA's affiliation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliationInfo {
    /// The full dotted name of this node.
    pub name: String,
    /// Child affiliations.
    #[serde(default)]
    pub affiliations: Vec<AffiliationInfo>,
}

/// Credentials for a first enrollment.
#[derive(Debug, Clone)]
pub struct EnrollRequest {
    /// The registered enrollment id.
    pub enrollment_id: String,
    /// The enrollment secret from registration.
    pub secret: String,
    /// The CSR subject; `CN=<enrollment_id>` when absent.
    pub subject: Option<String>,
    /// SANs requested in the CSR.
    pub subject_alt_names: Vec<GeneralName>,
    /// Curve for the freshly generated key.
    pub curve: Curve,
}

impl EnrollRequest {
    /// A P-256 enrollment with the default subject and no SANs.
    pub fn new(enrollment_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            secret: secret.into(),
            subject: None,
            subject_alt_names: Vec::new(),
            curve: Curve::P256,
        }
    }
}

#[derive(Debug, Serialize)]
struct CertificateRequest<'a> {
    certificate_request: &'a str,
    #[serde(rename = "caname", skip_serializing_if = "Option::is_none")]
    ca_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EnrollmentResult {
    #[serde(rename = "Cert")]
    cert: String,
    #[serde(rename = "ServerInfo", default)]
    server_info: Option<ServerInfo>,
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    #[serde(rename = "CAName", default)]
    ca_name: String,
    #[serde(rename = "CAChain", default)]
    ca_chain: String,
}

/// A freshly issued certificate and the key it certifies.
#[derive(Debug)]
pub struct Enrollment {
    /// The enrollment certificate, PEM.
    pub certificate: String,
    /// The issuing chain, PEM, possibly empty.
    pub ca_chain: String,
    /// The CA that issued it; empty when the server did not say.
    pub ca_name: String,
    /// The private key generated for the CSR.
    pub key: PrivateKeyHandle,
}

impl Enrollment {
    fn from_result(result: EnrollmentResult, key: PrivateKeyHandle) -> Result<Self, SdkError> {
        let certificate = decode_pem_field("Cert", &result.cert)?;
        let (ca_name, ca_chain) = match result.server_info {
            Some(info) => (info.ca_name, decode_pem_field("CAChain", &info.ca_chain)?),
            None => (String::new(), String::new()),
        };
        Ok(Self {
            certificate,
            ca_chain,
            ca_name,
            key,
        })
    }

    /// The private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> Result<String, CryptoError> {
        export_private_pem(&self.key)
    }

    /// A signing identity for `msp_id` backed by this enrollment.
    pub fn into_identity(self, msp_id: &str) -> Result<SigningIdentity, SdkError> {
        let key_pem = self.private_key_pem()?;
        SigningIdentity::new(msp_id, &self.certificate, &key_pem)
    }
}

fn decode_pem_field(field: &str, value: &str) -> Result<String, SdkError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|e| LedgerError::Decode(format!("{field}: {e}")))?;
    String::from_utf8(bytes).map_err(|e| LedgerError::Decode(format!("{field}: {e}")).into())
}

/// REST client for one certificate authority.
pub struct CaClient<'a> {
    ctx: &'a ClientContext,
    rest: RestClient,
    ca_name: Option<String>,
}

impl<'a> CaClient<'a> {
    /// A client for the CA named in the configuration.
    pub fn new(ctx: &'a ClientContext) -> Result<Self, SdkError> {
        let config = ctx
            .config()
            .ca
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("no certificate authority configured".into()))?;
        let rest = RestClient::new(
            non_empty(&config.url, "ca.url")?,
            ctx.timeout(RpcKind::Ca),
            config.tls_ca_path.as_deref(),
        )?;
        Ok(Self {
            ctx,
            rest,
            ca_name: config.ca_name.clone(),
        })
    }

    /// Generates a key, sends its CSR with basic auth and returns the issued
    /// certificate.
    pub async fn enroll(&self, request: &EnrollRequest) -> Result<Enrollment, OperationError> {
        run(self.ctx, "enroll", self.try_enroll(request)).await
    }

    async fn try_enroll(&self, request: &EnrollRequest) -> Result<Enrollment, SdkError> {
        let id = non_empty(&request.enrollment_id, "enrollment_id")?;
        let secret = non_empty(&request.secret, "secret")?;
        let subject = request
            .subject
            .clone()
            .unwrap_or_else(|| format!("CN={id}"));
        let key = PrivateKeyHandle::generate(request.curve);
        let csr = build_csr(&key, &subject, &request.subject_alt_names)?;
        let body = self.certificate_request(&csr)?;

        let url = self.rest.url("/api/v1/enroll");
        let response = self
            .rest
            .http()
            .post(&url)
            .basic_auth(id, Some(secret))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, text) = self.rest.read(&url, response).await?;
        let result: EnrollmentResult = parse_response(&url, status, &text)?;
        tracing::info!(target: "ca", enrollment_id = %id, "enrolled");
        Enrollment::from_result(result, key)
    }

    /// Renews `identity`'s certificate under a new key of the same curve.
    pub async fn reenroll(&self, identity: &SigningIdentity) -> Result<Enrollment, OperationError> {
        run(self.ctx, "reenroll", self.try_reenroll(identity)).await
    }

    async fn try_reenroll(&self, identity: &SigningIdentity) -> Result<Enrollment, SdkError> {
        let key = PrivateKeyHandle::generate(identity.curve());
        let csr = build_csr(&key, identity.subject(), &[])?;
        let body = self.certificate_request(&csr)?;
        let result: EnrollmentResult = self.signed_post(identity, "/api/v1/reenroll", body).await?;
        tracing::info!(target: "ca", subject = %identity.subject(), "re-enrolled");
        Enrollment::from_result(result, key)
    }

    /// Registers a new identity and returns its enrollment secret.
    pub async fn register(
        &self,
        registrar: &SigningIdentity,
        request: &RegistrationRequest,
    ) -> Result<String, OperationError> {
        run(self.ctx, "register", self.try_register(registrar, request)).await
    }

    async fn try_register(
        &self,
        registrar: &SigningIdentity,
        request: &RegistrationRequest,
    ) -> Result<String, SdkError> {
        non_empty(&request.enrollment_id, "enrollment_id")?;
        non_empty(&request.identity_type, "type")?;
        let mut body = serde_json::to_value(request)
            .map_err(|e| ValidationError::InvalidField {
                field: "registration",
                reason: e.to_string(),
            })?;
        if let (Some(name), Some(map)) = (&self.ca_name, body.as_object_mut()) {
            map.insert("caname".into(), serde_json::Value::String(name.clone()));
        }
        let body = serde_json::to_vec(&body).map_err(|e| ValidationError::InvalidField {
            field: "registration",
            reason: e.to_string(),
        })?;
        let result: RegistrationResult = self.signed_post(registrar, "/api/v1/register", body).await?;
        tracing::info!(target: "ca", enrollment_id = %request.enrollment_id, "registered");
        Ok(result.secret)
    }

    /// Lists the identities the registrar may see.
    pub async fn list_identities(
        &self,
        registrar: &SigningIdentity,
    ) -> Result<Vec<IdentityInfo>, OperationError> {
        run(self.ctx, "listIdentities", self.try_list_identities(registrar)).await
    }

    async fn try_list_identities(&self, registrar: &SigningIdentity) -> Result<Vec<IdentityInfo>, SdkError> {
        let list: IdentityList = self.signed_get(registrar, "/api/v1/identities").await?;
        Ok(list.identities)
    }

    /// Removes an identity; the CA must allow removal.
    pub async fn delete_identity(
        &self,
        registrar: &SigningIdentity,
        enrollment_id: &str,
    ) -> Result<IdentityInfo, OperationError> {
        run(self.ctx, "deleteIdentity", self.try_delete_identity(registrar, enrollment_id)).await
    }

    async fn try_delete_identity(
        &self,
        registrar: &SigningIdentity,
        enrollment_id: &str,
    ) -> Result<IdentityInfo, SdkError> {
        let id = non_empty(enrollment_id, "enrollment_id")?;
        let url = self.with_ca_query(self.rest.url(&format!("/api/v1/identities/{id}")));
        let token = auth_token(registrar, b"")?;
        let response = self
            .rest
            .http()
            .delete(&url)
            .header("Authorization", token)
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, text) = self.rest.read(&url, response).await?;
        let info = parse_response(&url, status, &text)?;
        tracing::info!(target: "ca", enrollment_id = %id, "identity removed");
        Ok(info)
    }

    /// Returns the affiliation tree visible to the registrar.
    pub async fn list_affiliations(
        &self,
        registrar: &SigningIdentity,
    ) -> Result<AffiliationInfo, OperationError> {
        run(self.ctx, "listAffiliations", self.signed_get(registrar, "/api/v1/affiliations")).await
    }

    fn certificate_request(&self, csr: &str) -> Result<Vec<u8>, SdkError> {
        serde_json::to_vec(&CertificateRequest {
            certificate_request: csr,
            ca_name: self.ca_name.as_deref(),
        })
        .map_err(|e| {
            ValidationError::InvalidField {
                field: "certificate_request",
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn with_ca_query(&self, url: String) -> String {
        match &self.ca_name {
            Some(name) => format!("{url}?ca={name}"),
            None => url,
        }
    }

    async fn signed_post<T: DeserializeOwned>(
        &self,
        identity: &SigningIdentity,
        path: &str,
        body: Vec<u8>,
    ) -> Result<T, SdkError> {
        let url = self.rest.url(path);
        let token = auth_token(identity, &body)?;
        let response = self
            .rest
            .http()
            .post(&url)
            .header("Authorization", token)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, text) = self.rest.read(&url, response).await?;
        parse_response(&url, status, &text)
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        identity: &SigningIdentity,
        path: &str,
    ) -> Result<T, SdkError> {
        let url = self.with_ca_query(self.rest.url(path));
        let token = auth_token(identity, b"")?;
        let response = self
            .rest
            .http()
            .get(&url)
            .header("Authorization", token)
            .send()
            .await
            .map_err(|e| self.rest.error(&url, e))?;
        let (status, text) = self.rest.read(&url, response).await?;
        parse_response(&url, status, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, identity_pems, test_identity};
    use stitch_crypto::der::key::{self, KeyMaterial};
    use stitch_crypto::sign::ecdsa::{der_to_signature, verify};
    use stitch_types::config::CaConfig;

    #[test]
    fn token_signs_body_and_certificate() {
        let identity = test_identity();
        let body = br#"{"id":"user1"}"#;
        let token = auth_token(&identity, body).unwrap();
        let (cert_b64, sig_b64) = token.split_once('.').unwrap();
        assert_eq!(
            STANDARD.decode(cert_b64).unwrap(),
            identity.cert_pem().as_bytes()
        );

        let KeyMaterial::Certificate(cert) = key::parse(identity.cert_pem()).unwrap() else {
            panic!("expected a certificate");
        };
        let public = stitch_crypto::PublicKeyHandle::from_ec_key(&cert.public_key).unwrap();
        let signature = der_to_signature(&STANDARD.decode(sig_b64).unwrap()).unwrap();
        let message = format!("{}.{cert_b64}", STANDARD.encode(body));
        assert!(verify(&public, &signature, message.as_bytes()).unwrap());
    }

    #[test]
    fn error_body_becomes_an_authority_error() {
        let body = r#"{"success":false,"result":"","errors":[{"code":20,"message":"Authentication failure"}],"messages":[]}"#;
        let err = parse_response::<IdentityList>("https://ca/api/v1/enroll", 401, body).unwrap_err();
        assert_eq!(
            err,
            SdkError::Ledger(LedgerError::Authority {
                code: 20,
                message: "Authentication failure".into()
            })
        );
    }

    #[test]
    fn non_json_failure_keeps_the_http_status() {
        let err = parse_response::<IdentityList>("https://ca/x", 502, "Bad Gateway").unwrap_err();
        assert_eq!(err.status(), 502);
        let err = parse_response::<IdentityList>("https://ca/x", 200, "<html>").unwrap_err();
        assert!(matches!(err, SdkError::Ledger(LedgerError::Decode(_))));
    }

    #[test]
    fn identity_list_is_decoded() {
        let body = r#"{"success":true,"result":{"identities":[{"id":"admin","type":"client","affiliation":"","max_enrollments":-1,"attrs":[{"name":"hf.Registrar.Roles","value":"*"}]}],"caname":"ca-org1"},"errors":[],"messages":[]}"#;
        let list: IdentityList = parse_response("https://ca/api/v1/identities", 200, body).unwrap();
        assert_eq!(list.identities.len(), 1);
        assert_eq!(list.identities[0].max_enrollments, -1);
        assert!(!list.identities[0].attrs[0].ecert);
    }

    #[test]
    fn enrollment_result_decodes_base64_pem() {
        let (cert, _) = identity_pems();
        let result = EnrollmentResult {
            cert: STANDARD.encode(&cert),
            server_info: Some(ServerInfo {
                ca_name: "ca-org1".into(),
                ca_chain: STANDARD.encode(&cert),
            }),
        };
        let enrollment = Enrollment::from_result(result, PrivateKeyHandle::generate(Curve::P256)).unwrap();
        assert_eq!(enrollment.certificate, cert);
        assert_eq!(enrollment.ca_chain, cert);
        assert_eq!(enrollment.ca_name, "ca-org1");
    }

    #[test]
    fn registration_serializes_ca_field_names() {
        let mut request = RegistrationRequest::client("user1", "org1.department1");
        request.attrs.push(Attribute {
            name: "role".into(),
            value: "auditor".into(),
            ecert: true,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["id"], "user1");
        assert_eq!(json["type"], "client");
        assert!(json.get("secret").is_none());
        assert_eq!(json["attrs"][0]["ecert"], true);
    }

    #[test]
    fn client_requires_configured_ca() {
        let ctx = ClientContext::new(config(&[]));
        assert!(matches!(
            CaClient::new(&ctx),
            Err(SdkError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn unreachable_ca_is_a_normalized_connection_error() {
        let mut cfg = config(&[]);
        cfg.ca = Some(CaConfig {
            url: "http://127.0.0.1:1".into(),
            ca_name: None,
            tls_ca_path: None,
        });
        let ctx = ClientContext::new(cfg);
        let client = CaClient::new(&ctx).unwrap();
        let err = client
            .enroll(&EnrollRequest::new("admin", "adminpw"))
            .await
            .unwrap_err();
        assert_eq!(err.function_name, "enroll");
        assert_eq!(err.status(), 14);

        let err = client
            .enroll(&EnrollRequest::new("admin", " "))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 3);
    }
}
