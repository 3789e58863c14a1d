/// A user identity token presented during ActivateSession, validated
/// against the policy's user-token policy before the session is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentity {
    Anonymous,
    UserName { user_name: String, password: Vec<u8> },
    X509 { certificate: Vec<u8> },
    Issued { token_data: Vec<u8> },
}

impl UserIdentity {
    pub fn policy_id(&self) -> &'static str {
        match self {
            UserIdentity::Anonymous => "anonymous",
            UserIdentity::UserName { .. } => "username",
            UserIdentity::X509 { .. } => "x509",
            UserIdentity::Issued { .. } => "issued",
        }
    }
}
