use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
pub fn generate_token(
    user_id: u64,
    role: u8,
    employee_id: Option<u64>,
    token_type: crate::models::TokenType,
    secret: &str,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        user_id,
        sub: format!("user{user_id}"),
        role,
        exp: (chrono::Utc::now().timestamp() + 900) as usize,
        jti: format!("test-{user_id}"),
        token_type,
        employee_id,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;

    #[test]
    fn verifies_own_tokens_and_rejects_foreign_ones() {
        let token = generate_token(7, 3, Some(1), TokenType::Access, "secret");
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.employee_id, Some(1));
        assert_eq!(claims.token_type, TokenType::Access);

        assert!(verify_token(&token, "other-secret").is_err());
        assert!(verify_token("garbage", "secret").is_err());
    }
}
