use base64::Engine;
use chrono::NaiveDateTime;
use rand::RngCore;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db::queries;
use crate::models::customer::CustomerDetails;
use crate::models::Customer;

/// Finds the customer by phone, then email, provisioning a new record with a
/// random placeholder credential when neither matches.
pub fn resolve_customer(
    conn: &Connection,
    details: &CustomerDetails,
    now: NaiveDateTime,
) -> anyhow::Result<Customer> {
    let phone = details.phone.trim();
    let email = details
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if let Some(existing) = queries::find_customer_by_phone(conn, phone)? {
        return Ok(existing);
    }

    if let Some(email) = email {
        if let Some(existing) = queries::find_customer_by_email(conn, email)? {
            return Ok(existing);
        }
    }

    let customer = Customer {
        id: uuid::Uuid::new_v4().to_string(),
        name: details.name.trim().to_string(),
        phone: phone.to_string(),
        email: email.map(str::to_string),
        password_hash: hash_credential(&generate_placeholder_credential()),
        created_at: now,
    };
    queries::create_customer(conn, &customer)?;

    tracing::info!(customer_id = %customer.id, "provisioned walk-in customer");
    Ok(customer)
}

/// 256 random bits, base64url encoded. Never stored in clear.
fn generate_placeholder_credential() -> String {
    let mut rng = rand::thread_rng();
    let mut random_bytes = [0u8; 32];
    rng.fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

fn hash_credential(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-01-01 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn details(name: &str, phone: &str, email: Option<&str>) -> CustomerDetails {
        CustomerDetails {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_provisions_new_customer() {
        let conn = setup_db();
        let customer =
            resolve_customer(&conn, &details("Ana", "+15550001", Some("ana@example.com")), now()).unwrap();

        assert_eq!(customer.phone, "+15550001");
        assert_eq!(customer.password_hash.len(), 64);
        assert!(queries::find_customer_by_phone(&conn, "+15550001").unwrap().is_some());
    }

    #[test]
    fn test_phone_match_wins() {
        let conn = setup_db();
        let first = resolve_customer(&conn, &details("Ana", "+15550001", None), now()).unwrap();
        let second =
            resolve_customer(&conn, &details("Ana B", " +15550001 ", Some("new@example.com")), now()).unwrap();

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_falls_back_to_email() {
        let conn = setup_db();
        let first =
            resolve_customer(&conn, &details("Ana", "+15550001", Some("ana@example.com")), now()).unwrap();
        let second =
            resolve_customer(&conn, &details("Ana", "+15550002", Some("ana@example.com")), now()).unwrap();

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_placeholder_credentials_are_unique() {
        let a = generate_placeholder_credential();
        let b = generate_placeholder_credential();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert_ne!(hash_credential(&a), hash_credential(&b));
    }
}
