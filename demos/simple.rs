//! Mapping a record to both wire formats.
//!
//! Run with: cargo run --example simple

use flexjson::{binary, Context, Document, Field, Keys, Record, Schema, WireFormat};
use std::error::Error;

#[derive(Debug, Clone, Default, PartialEq)]
struct User {
    id: String,
    username: String,
    email: String,
}

impl Record for User {
    fn schema() -> Schema<Self> {
        Schema::new()
            .identity("id", |u: &User| &u.id, |u: &mut User| &mut u.id)
            .field(
                Field::new("username", |u: &User| &u.username, |u: &mut User| &mut u.username)
                    .keys(Keys::new().binary("sn")),
            )
            .field(
                Field::new("email", |u: &User| &u.email, |u: &mut User| &mut u.email)
                    .keys(Keys::new().text("emailAddress")),
            )
    }

    fn validate(&self, errors: &mut Vec<String>) {
        flexjson::check(self.email.contains('@'), "email must contain '@'", errors);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let user = User {
        id: String::new(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
    };

    // Blank identities get a fresh object id
    let text = Document::from_model(&user, WireFormat::Text);
    println!("Text form:\n{}\n", text.to_text_pretty());

    let ctx = Context::default();
    let bytes = binary::to_binary(&user, &ctx)?;
    let stored = binary::from_bytes(&bytes, &ctx)?;
    println!("Binary form ({} bytes) keys: {:?}\n", bytes.len(), stored.keys());

    let back: User = stored.to_model(WireFormat::Binary)?;
    assert_eq!(back.username, user.username);
    println!("✓ Round-trip successful, id {}", back.id);

    Ok(())
}
