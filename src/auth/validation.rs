//! Input rules for the auth endpoints. Every rule is checked so the caller
//! gets the full list of offending fields in one response.

use lazy_static::lazy_static;
use regex::Regex;
use url::form_urlencoded;

use crate::{
    auth::dto::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    error::{AppError, FieldError},
};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;

const AVATAR_BASE: &str = "https://ui-avatars.com/api/";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Percent-encodes like JavaScript's `encodeURIComponent`: space is `%20`
/// and `!~'()` stay literal.
fn encode_component(raw: &str) -> String {
    let mut out: String = form_urlencoded::byte_serialize(raw.as_bytes()).collect();
    for (escaped, literal) in [
        ("+", "%20"),
        ("%21", "!"),
        ("%7E", "~"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
    ] {
        out = out.replace(escaped, literal);
    }
    out
}

pub fn avatar_url(name: &str) -> String {
    format!(
        "{AVATAR_BASE}?background=6366f1&color=fff&name={}",
        encode_component(name)
    )
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    let len = name.chars().count();
    if len == 0 {
        errors.push(FieldError::new("name", "Name is required"));
    } else if !(NAME_MIN..=NAME_MAX).contains(&len) {
        errors.push(FieldError::new(
            "name",
            format!("Name must be between {NAME_MIN} and {NAME_MAX} characters"),
        ));
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
}

fn check_new_password(password: &str, require_digit: bool, errors: &mut Vec<FieldError>) {
    if password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        ));
    } else if require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(
            "password",
            "Password must contain at least one number",
        ));
    }
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, AppError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(AppError::Validation(errors))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub fn registration(req: RegisterRequest) -> Result<Registration, AppError> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    let mut errors = Vec::new();
    check_name(&name, &mut errors);
    check_email(&email, &mut errors);
    check_new_password(&req.password, true, &mut errors);
    finish(
        Registration {
            name,
            email,
            password: req.password,
        },
        errors,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn credentials(req: LoginRequest) -> Result<Credentials, AppError> {
    let email = normalize_email(&req.email);
    let mut errors = Vec::new();
    check_email(&email, &mut errors);
    if req.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    finish(
        Credentials {
            email,
            password: req.password,
        },
        errors,
    )
}

/// Normalized profile edits; empty strings count as not provided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub fn profile_edit(req: UpdateProfileRequest) -> Result<ProfileEdit, AppError> {
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let email = req
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty());
    let password = req.password.filter(|p| !p.is_empty());

    let mut errors = Vec::new();
    if let Some(name) = &name {
        check_name(name, &mut errors);
    }
    if let Some(email) = &email {
        check_email(email, &mut errors);
    }
    if let Some(password) = &password {
        check_new_password(password, false, &mut errors);
    }
    finish(
        ProfileEdit {
            name,
            email,
            password,
        },
        errors,
    )
}
