//! Client-side form validation.
//!
//! These run before any request is sent. Each form reports every failing
//! field at once so a UI can mark them all.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::campaign::{DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_DELAY_BETWEEN_MESSAGES};
use crate::models::{NewCampaign, NewChannel, NewContact, ProtectionType};

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum display name length.
pub const MIN_NAME_LENGTH: usize = 2;

/// Minimum phone number length, counted on the trimmed input.
pub const MIN_PHONE_LENGTH: usize = 8;

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn email_regex() -> Option<&'static Regex> {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

/// Field name to message, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    /// Record the error from a single-field check, if any.
    pub fn check(&mut self, field: &'static str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// ===== Single-field rules =====

pub fn validate_email(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if !email_regex().is_some_and(|re| re.is_match(value)) {
        return Err("Please enter a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("Password is required".to_string());
    }
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

pub fn validate_name(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().count() < MIN_NAME_LENGTH {
        return Err(format!("Name must be at least {} characters", MIN_NAME_LENGTH));
    }
    Ok(())
}

pub fn validate_phone(value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if trimmed.chars().count() < MIN_PHONE_LENGTH {
        return Err("Please enter a valid phone number".to_string());
    }
    Ok(())
}

fn required(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

// ===== Forms =====

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("email", validate_email(&self.email));
        errors.check("password", validate_password(&self.password));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", validate_name(&self.name));
        errors.check("email", validate_email(&self.email));
        errors.check("phone", validate_phone(&self.phone));
        errors.check("password", validate_password(&self.password));
        errors.into_result()
    }

    /// Copy with surrounding whitespace removed, as sent to the server.
    /// The password is left untouched.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewChannelForm {
    pub name: String,
    pub phone_number: String,
}

impl NewChannelForm {
    pub fn validate(&self) -> Result<NewChannel, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(&self.name, "Channel name is required"));
        errors.check("phoneNumber", required(&self.phone_number, "Phone number is required"));
        errors.into_result()?;
        Ok(NewChannel {
            name: self.name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContactForm {
    pub name: String,
    pub phone_number: String,
    pub notes: String,
    pub channel_ids: Vec<String>,
}

impl NewContactForm {
    pub fn validate(&self) -> Result<NewContact, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(&self.name, "Contact name is required"));
        errors.check("phoneNumber", required(&self.phone_number, "Phone number is required"));
        errors.into_result()?;
        let notes = self.notes.trim();
        Ok(NewContact {
            name: self.name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            channel_ids: (!self.channel_ids.is_empty()).then(|| self.channel_ids.clone()),
        })
    }
}

/// Campaign form as typed by the user; pacing fields are free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCampaignForm {
    pub name: String,
    pub message: String,
    pub channel_id: String,
    pub contact_ids: Vec<String>,
    pub protection_enabled: bool,
    pub protection_type: Option<ProtectionType>,
    pub delay_between_messages: String,
    pub batch_size: String,
    pub batch_delay: String,
    pub send_image_first: bool,
}

/// Parse a positive integer, falling back to `default` for blank, zero or
/// unparsable input.
fn number_or(raw: &str, default: u32) -> u32 {
    raw.trim().parse().ok().filter(|n| *n > 0).unwrap_or(default)
}

impl NewCampaignForm {
    pub fn validate(&self) -> Result<NewCampaign, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(&self.name, "Campaign name is required"));
        errors.check("message", required(&self.message, "Message text is required"));
        errors.check("channelId", required(&self.channel_id, "Please choose a channel"));
        if self.contact_ids.is_empty() {
            errors.add("contactIds", "Please choose at least one contact");
        }
        errors.into_result()?;

        Ok(NewCampaign {
            name: self.name.trim().to_string(),
            message: self.message.trim().to_string(),
            channel_id: self.channel_id.clone(),
            protection_enabled: self.protection_enabled,
            protection_type: self.protection_type.unwrap_or_default(),
            delay_between_messages: number_or(&self.delay_between_messages, DEFAULT_DELAY_BETWEEN_MESSAGES),
            batch_size: number_or(&self.batch_size, DEFAULT_BATCH_SIZE),
            batch_delay: number_or(&self.batch_delay, DEFAULT_BATCH_DELAY),
            send_image_first: self.send_image_first,
            contact_ids: self.contact_ids.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_rules() {
        assert!(validate_email("a@b.com").is_ok());
        assert_eq!(validate_email("   ").unwrap_err(), "Email is required");
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_email("@b.com").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("12345").is_err());
        assert_eq!(validate_password("").unwrap_err(), "Password is required");
    }

    #[test]
    fn test_name_and_phone_rules() {
        assert!(validate_name(" Al ").is_ok());
        assert!(validate_name(" A ").is_err());
        assert!(validate_phone("01000000").is_ok());
        assert!(validate_phone(" 0100000 ").is_err());
    }

    #[test]
    fn test_login_form_reports_all_fields() {
        let errors = LoginForm::new("nope", "123").validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert!(LoginForm::new("a@b.com", "secret1").validate().is_ok());
    }

    #[test]
    fn test_register_form_trims() {
        let form = RegisterForm {
            name: "  Ali ".into(),
            email: " ali@example.com ".into(),
            phone: " 0100000000 ".into(),
            password: " secret ".into(),
        };
        assert!(form.validate().is_err(), "untrimmed email fails the pattern");
        let trimmed = form.trimmed();
        assert!(trimmed.validate().is_ok());
        assert_eq!(trimmed.name, "Ali");
        assert_eq!(trimmed.password, " secret ");
    }

    #[test]
    fn test_campaign_form_defaults_pacing() {
        let form = NewCampaignForm {
            name: " Promo ".into(),
            message: "Hi".into(),
            channel_id: "ch1".into(),
            contact_ids: vec!["c1".into()],
            delay_between_messages: "abc".into(),
            batch_size: "0".into(),
            batch_delay: " 60 ".into(),
            ..Default::default()
        };
        let campaign = form.validate().unwrap();
        assert_eq!(campaign.name, "Promo");
        assert_eq!(campaign.delay_between_messages, 30);
        assert_eq!(campaign.batch_size, 10);
        assert_eq!(campaign.batch_delay, 60);
        assert_eq!(campaign.protection_type, ProtectionType::Numbers);
    }

    #[test]
    fn test_campaign_form_requires_contacts_and_channel() {
        let form = NewCampaignForm { name: "x".into(), message: "y".into(), ..Default::default() };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("channelId").is_some());
        assert!(errors.get("contactIds").is_some());
    }

    #[test]
    fn test_contact_form_drops_blank_optionals() {
        let form = NewContactForm {
            name: " Mona ".into(),
            phone_number: "0100".into(),
            notes: "  ".into(),
            channel_ids: vec![],
        };
        let contact = form.validate().unwrap();
        assert_eq!(contact.name, "Mona");
        assert_eq!(contact.notes, None);
        assert_eq!(contact.channel_ids, None);
        assert!(NewContactForm::default().validate().unwrap_err().get("phoneNumber").is_some());
    }

    #[test]
    fn test_channel_form() {
        let form = NewChannelForm { name: " Sales ".into(), phone_number: "".into() };
        assert!(form.validate().is_err());
        let form = NewChannelForm { name: " Sales ".into(), phone_number: "+20100".into() };
        assert_eq!(form.validate().unwrap().name, "Sales");
    }
}
