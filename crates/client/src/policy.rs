// Path: crates/client/src/policy.rs
//! Endorsement and channel policies.
//!
//! Two authoring syntaxes produce the same [`Policy`] and therefore the same
//! wire bytes:
//!
//! - the string DSL: `AND('Org1MSP.member', OR('Org2MSP.peer', 'Org3MSP.admin'))`,
//!   `OutOf(2, 'A.member', 'B.member', 'C.member')`, `MAJORITY Endorsement`;
//! - a JSON document: `{"identities": [{"role": {"name": "member", "mspId":
//!   "Org1MSP"}}], "policy": {"1-of": [{"signed-by": 0}]}}` or
//!   `{"implicitMeta": {"rule": "ANY", "subPolicy": "Readers"}}`.

use prost::Message;
use serde::Deserialize;
use serde_json::Value;
use stitch_ipc::common::{
    application_policy, signature_policy, ApplicationPolicy, ImplicitMetaPolicy,
    ImplicitMetaRule, NOutOf, Policy as PolicyMessage, PolicyType, SignaturePolicy as RuleMessage,
    SignaturePolicyEnvelope,
};
use stitch_ipc::msp::{MspPrincipal, MspRole, MspRoleType, PrincipalClassification};
use stitch_types::app::EndorsementPolicyRef;
use stitch_types::error::ValidationError;

/// Deepest gate nesting accepted in either policy syntax.
pub const MAX_POLICY_DEPTH: usize = 32;

/// An MSP role principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub msp_id: String,
    pub role: MspRoleType,
}

impl Principal {
    fn parse(text: &str) -> Result<Self, ValidationError> {
        let (msp_id, role) = text
            .rsplit_once('.')
            .ok_or_else(|| invalid(format!("principal '{text}' is not MSP.role")))?;
        if msp_id.is_empty() {
            return Err(invalid(format!("principal '{text}' has no MSP id")));
        }
        Ok(Self {
            msp_id: msp_id.to_string(),
            role: parse_role(role)?,
        })
    }

    fn to_proto(&self) -> MspPrincipal {
        MspPrincipal {
            principal_classification: PrincipalClassification::Role as i32,
            principal: MspRole {
                msp_identifier: self.msp_id.clone(),
                role: self.role as i32,
            }
            .encode_to_vec(),
        }
    }
}

fn parse_role(role: &str) -> Result<MspRoleType, ValidationError> {
    match role.to_ascii_lowercase().as_str() {
        "member" => Ok(MspRoleType::Member),
        "admin" => Ok(MspRoleType::Admin),
        "client" => Ok(MspRoleType::Client),
        "peer" => Ok(MspRoleType::Peer),
        "orderer" => Ok(MspRoleType::Orderer),
        other => Err(invalid(format!("unknown role '{other}'"))),
    }
}

/// A node of a signature rule tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Index into the principal table.
    SignedBy(usize),
    /// At least `n` of the children.
    OutOf { n: usize, rules: Vec<Rule> },
}

impl Rule {
    fn to_proto(&self) -> Result<RuleMessage, ValidationError> {
        let kind = match self {
            Rule::SignedBy(i) => signature_policy::Type::SignedBy(to_i32(*i)?),
            Rule::OutOf { n, rules } => signature_policy::Type::NOutOf(NOutOf {
                n: to_i32(*n)?,
                rules: rules
                    .iter()
                    .map(Rule::to_proto)
                    .collect::<Result<_, _>>()?,
            }),
        };
        Ok(RuleMessage { r#type: Some(kind) })
    }
}

fn to_i32(value: usize) -> Result<i32, ValidationError> {
    i32::try_from(value).map_err(|_| invalid(format!("{value} is out of range")))
}

/// Principals plus a rule over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePolicy {
    /// Distinct principals; rules refer to them by index.
    pub identities: Vec<Principal>,
    pub rule: Rule,
}

impl SignaturePolicy {
    /// The protobuf form.
    pub fn to_envelope(&self) -> Result<SignaturePolicyEnvelope, ValidationError> {
        Ok(SignaturePolicyEnvelope {
            version: 0,
            rule: Some(self.rule.to_proto()?),
            identities: self.identities.iter().map(Principal::to_proto).collect(),
        })
    }
}

/// A rule over the same-named policies of child groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitMeta {
    pub rule: ImplicitMetaRule,
    pub sub_policy: String,
}

/// Either policy kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Signature(SignaturePolicy),
    ImplicitMeta(ImplicitMeta),
}

impl Policy {
    /// Parses either syntax; text starting with `{` is read as JSON.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::MissingField("policy"));
        }
        if text.starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_dsl(text)
        }
    }

    /// Parses the string DSL.
    pub fn from_dsl(text: &str) -> Result<Self, ValidationError> {
        if let Some(meta) = parse_implicit_meta(text)? {
            return Ok(Policy::ImplicitMeta(meta));
        }
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            identities: Vec::new(),
        };
        let rule = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(invalid(format!("trailing input in '{text}'")));
        }
        Ok(Policy::Signature(SignaturePolicy {
            identities: parser.identities,
            rule,
        }))
    }

    /// Parses the JSON document form.
    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        let doc: JsonPolicy =
            serde_json::from_str(text).map_err(|e| invalid(format!("policy JSON: {e}")))?;
        match doc {
            JsonPolicy::ImplicitMeta { implicit_meta } => Ok(Policy::ImplicitMeta(ImplicitMeta {
                rule: parse_meta_rule(&implicit_meta.rule)
                    .ok_or_else(|| invalid(format!("unknown rule '{}'", implicit_meta.rule)))?,
                sub_policy: non_blank(implicit_meta.sub_policy)?,
            })),
            JsonPolicy::Signature { identities, policy } => {
                let identities = identities
                    .into_iter()
                    .map(|i| {
                        Ok(Principal {
                            msp_id: non_blank(i.role.msp_id)?,
                            role: parse_role(&i.role.name)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ValidationError>>()?;
                let rule = json_rule(&policy, identities.len(), 1)?;
                Ok(Policy::Signature(SignaturePolicy { identities, rule }))
            }
        }
    }

    /// The type tag used when the policy sits in a channel config.
    pub fn policy_type(&self) -> PolicyType {
        match self {
            Policy::Signature(_) => PolicyType::Signature,
            Policy::ImplicitMeta(_) => PolicyType::ImplicitMeta,
        }
    }

    /// The signature envelope, for signature policies only.
    pub fn to_signature_envelope(&self) -> Result<SignaturePolicyEnvelope, ValidationError> {
        match self {
            Policy::Signature(p) => p.to_envelope(),
            Policy::ImplicitMeta(_) => Err(invalid(
                "implicit meta policies have no signature envelope".into(),
            )),
        }
    }

    /// The typed, encoded policy used in channel configuration.
    pub fn to_proto(&self) -> Result<PolicyMessage, ValidationError> {
        let value = match self {
            Policy::Signature(p) => p.to_envelope()?.encode_to_vec(),
            Policy::ImplicitMeta(m) => ImplicitMetaPolicy {
                sub_policy: m.sub_policy.clone(),
                rule: m.rule as i32,
            }
            .encode_to_vec(),
        };
        Ok(PolicyMessage {
            r#type: self.policy_type() as i32,
            value,
        })
    }

    /// The chaincode-level form; implicit meta policies are not allowed here.
    pub fn to_application_policy(&self) -> Result<ApplicationPolicy, ValidationError> {
        Ok(ApplicationPolicy {
            r#type: Some(application_policy::Type::SignaturePolicy(
                self.to_signature_envelope()?,
            )),
        })
    }
}

/// Resolves a chaincode endorsement policy reference.
pub fn application_policy(
    reference: &EndorsementPolicyRef,
) -> Result<ApplicationPolicy, ValidationError> {
    match reference {
        EndorsementPolicyRef::ChannelConfigPolicy(path) => Ok(ApplicationPolicy {
            r#type: Some(application_policy::Type::ChannelConfigPolicyReference(
                non_blank(path.clone())?,
            )),
        }),
        EndorsementPolicyRef::SignaturePolicy(text) => Policy::parse(text)?.to_application_policy(),
    }
}

fn invalid(reason: String) -> ValidationError {
    ValidationError::InvalidPolicy(reason)
}

fn non_blank(value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("empty name".into()))
    } else {
        Ok(value)
    }
}

fn parse_meta_rule(word: &str) -> Option<ImplicitMetaRule> {
    match word.to_ascii_uppercase().as_str() {
        "ANY" => Some(ImplicitMetaRule::Any),
        "ALL" => Some(ImplicitMetaRule::All),
        "MAJORITY" => Some(ImplicitMetaRule::Majority),
        _ => None,
    }
}

fn parse_implicit_meta(text: &str) -> Result<Option<ImplicitMeta>, ValidationError> {
    let mut words = text.split_whitespace();
    let (Some(first), Some(second), None) = (words.next(), words.next(), words.next()) else {
        return Ok(None);
    };
    match parse_meta_rule(first) {
        Some(rule) if second.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Ok(Some(ImplicitMeta {
                rule,
                sub_policy: second.to_string(),
            }))
        }
        Some(_) => Err(invalid(format!("bad sub-policy name '{second}'"))),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Int(usize),
    Open,
    Close,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ValidationError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(other) => value.push(other),
                        None => return Err(invalid("unterminated quote".into())),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| invalid(format!("bad number '{digits}'")))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_alphanumeric()) {
                    word.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(word));
            }
            other => return Err(invalid(format!("unexpected '{other}'"))),
        }
    }
    Ok(tokens)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    identities: Vec<Principal>,
}

impl Parser<'_> {
    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, want: &Token) -> Result<(), ValidationError> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            other => Err(invalid(format!("expected {want:?}, found {other:?}"))),
        }
    }

    fn principal(&mut self, text: &str) -> Result<Rule, ValidationError> {
        let principal = Principal::parse(text)?;
        let index = match self.identities.iter().position(|p| *p == principal) {
            Some(i) => i,
            None => {
                self.identities.push(principal);
                self.identities.len() - 1
            }
        };
        Ok(Rule::SignedBy(index))
    }

    fn expr(&mut self) -> Result<Rule, ValidationError> {
        let token = self.next().cloned();
        match token {
            Some(Token::Str(s)) => self.principal(&s),
            Some(Token::Ident(word)) => {
                let op = word.to_ascii_lowercase();
                self.depth += 1;
                if self.depth > MAX_POLICY_DEPTH {
                    return Err(too_deep());
                }
                self.expect(&Token::Open)?;
                let threshold = if op == "outof" {
                    let n = match self.next().cloned() {
                        Some(Token::Int(n)) => n,
                        other => return Err(invalid(format!("OutOf needs a count, found {other:?}"))),
                    };
                    self.expect(&Token::Comma)?;
                    Some(n)
                } else if op == "and" || op == "or" {
                    None
                } else {
                    return Err(invalid(format!("unknown operator '{word}'")));
                };
                let mut rules = vec![self.expr()?];
                loop {
                    match self.next().cloned() {
                        Some(Token::Comma) => rules.push(self.expr()?),
                        Some(Token::Close) => break,
                        other => return Err(invalid(format!("expected ',' or ')', found {other:?}"))),
                    }
                }
                let n = match (threshold, op.as_str()) {
                    (Some(n), _) => n,
                    (None, "and") => rules.len(),
                    _ => 1,
                };
                if n == 0 || n > rules.len() {
                    return Err(invalid(format!("threshold {n} with {} rules", rules.len())));
                }
                self.depth -= 1;
                Ok(Rule::OutOf { n, rules })
            }
            other => Err(invalid(format!("unexpected {other:?}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPolicy {
    ImplicitMeta {
        #[serde(rename = "implicitMeta")]
        implicit_meta: JsonImplicitMeta,
    },
    Signature {
        identities: Vec<JsonIdentity>,
        policy: Value,
    },
}

#[derive(Deserialize)]
struct JsonImplicitMeta {
    rule: String,
    #[serde(rename = "subPolicy")]
    sub_policy: String,
}

#[derive(Deserialize)]
struct JsonIdentity {
    role: JsonRole,
}

#[derive(Deserialize)]
struct JsonRole {
    name: String,
    #[serde(rename = "mspId")]
    msp_id: String,
}

fn too_deep() -> ValidationError {
    invalid(format!("policy nests deeper than {MAX_POLICY_DEPTH} levels"))
}

fn json_rule(value: &Value, identities: usize, depth: usize) -> Result<Rule, ValidationError> {
    let object = value
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| invalid("each rule must be an object with one key".into()))?;
    let Some((key, body)) = object.iter().next() else {
        return Err(invalid("empty rule".into()));
    };
    if key == "signed-by" {
        let index = body
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < identities)
            .ok_or_else(|| invalid(format!("signed-by {body} is not a valid identity index")))?;
        return Ok(Rule::SignedBy(index));
    }
    let n: usize = key
        .strip_suffix("-of")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| invalid(format!("unknown rule key '{key}'")))?;
    if depth > MAX_POLICY_DEPTH {
        return Err(too_deep());
    }
    let children = body
        .as_array()
        .ok_or_else(|| invalid(format!("'{key}' needs an array")))?;
    let rules = children
        .iter()
        .map(|c| json_rule(c, identities, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;
    if n == 0 || n > rules.len() {
        return Err(invalid(format!("threshold {n} with {} rules", rules.len())));
    }
    Ok(Rule::OutOf { n, rules })
}
