pub mod bookings;
pub mod users;
pub mod webhook_events;

use validator::ValidationErrors;

/// First human-readable message from a failed `validate()`, taking fields
/// in alphabetical order so the result does not depend on map iteration.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field.clone(), e)))
        .map(|(field, e)| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {field}"))
        })
        .next()
        .unwrap_or_else(|| "Invalid input".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn first_message_comes_from_the_alphabetically_first_field() {
        let signup = users::Signup {
            email: "not-an-email".to_string(),
            password: "123".to_string(),
            full_name: Some("A".to_string()),
        };
        let errors = signup.validate().unwrap_err();

        assert_eq!(validation_message(&errors), "A valid email is required");
    }
}
