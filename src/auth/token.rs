use uuid::Uuid;

/// Length of every token this module hands out (hyphenated UUID).
pub const TOKEN_LEN: usize = 36;

/// Opaque bearer value for sessions, email verification and password reset.
///
/// UUID v4: 122 random bits from the OS generator, so values are neither sequential
/// nor derivable from earlier tokens.
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Shape check only. Lets callers reject garbage before a store round-trip.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && Uuid::try_parse(token).is_ok()
}
