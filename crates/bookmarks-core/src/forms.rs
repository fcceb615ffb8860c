//! Structural validation of the account forms.
//!
//! Each form is deserialised from the raw request body and then `clean`ed into
//! typed values, collecting every field error rather than stopping at the
//! first. Rules that need the store (username and e-mail uniqueness) are
//! applied by the caller on top of a clean result.

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::user::{ProfileChanges, UserChanges};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may \
                                    contain only letters, numbers, and \
                                    @/./+/-/_ characters.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded \
                                 was either not an image or a corrupted image.";
pub const PASSWORD_MISMATCH: &str = "Passwords don't match.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "Email already in use.";

pub const MAX_NAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_BIO_LEN: usize = 500;
pub const MIN_PASSWORD_LEN: usize = 8;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
  fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
  /// Key for errors that do not belong to a single field.
  pub const NON_FIELD: &'static str = "__all__";

  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.fields.entry(field.to_owned()).or_default().push(message.into());
  }

  /// Messages for `field`; empty when it validated.
  pub fn get(&self, field: &str) -> &[String] {
    self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn has(&self, field: &str) -> bool { !self.get(field).is_empty() }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn merge(&mut self, other: FieldErrors) {
    for (field, messages) in other.fields {
      self.fields.entry(field).or_default().extend(messages);
    }
  }

  /// `Ok(value)` when no errors were collected.
  pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.fields {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{field}: {message}")?;
        first = false;
      }
    }
    Ok(())
  }
}

impl std::error::Error for FieldErrors {}

// ─── Field rules ─────────────────────────────────────────────────────────────

fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
  let n = value.chars().count();
  if n > max {
    errors.add(
      field,
      format!("Ensure this value has at most {max} characters (it has {n})."),
    );
  }
}

fn check_username(errors: &mut FieldErrors, username: &str) {
  if username.is_empty() {
    errors.add("username", REQUIRED);
    return;
  }
  check_max_len(errors, "username", username, MAX_NAME_LEN);
  let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
  if !username.chars().all(allowed) {
    errors.add("username", INVALID_USERNAME);
  }
}

/// A deliberately small shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
  if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') {
    return false;
  }
  let labels: Vec<&str> = domain.split('.').collect();
  labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

fn check_optional_email(errors: &mut FieldErrors, email: &str) {
  if !email.is_empty() && !is_valid_email(email) {
    errors.add("email", INVALID_EMAIL);
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

impl LoginForm {
  pub fn clean(&self) -> Result<(String, String), FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = self.username.trim();
    if username.is_empty() {
      errors.add("username", REQUIRED);
    }
    if self.password.is_empty() {
      errors.add("password", REQUIRED);
    }
    errors.into_result((username.to_owned(), self.password.clone()))
  }
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
  #[serde(default)]
  pub username:   String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub email:      String,
  #[serde(default)]
  pub password:   String,
  /// Repeat of `password`.
  #[serde(default)]
  pub password2:  String,
}

/// A structurally valid registration; the password is still in clear text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanRegistration {
  pub username:   String,
  pub first_name: String,
  pub email:      String,
  pub password:   String,
}

impl RegistrationForm {
  pub fn clean(&self) -> Result<CleanRegistration, FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = self.username.trim();
    let first_name = self.first_name.trim();
    let email = self.email.trim();

    check_username(&mut errors, username);
    check_max_len(&mut errors, "first_name", first_name, MAX_NAME_LEN);
    check_optional_email(&mut errors, email);

    if self.password.is_empty() {
      errors.add("password", REQUIRED);
    } else if self.password.chars().count() < MIN_PASSWORD_LEN {
      errors.add(
        "password",
        format!(
          "This password is too short. It must contain at least \
           {MIN_PASSWORD_LEN} characters."
        ),
      );
    }
    if self.password2.is_empty() {
      errors.add("password2", REQUIRED);
    } else if self.password != self.password2 {
      errors.add("password2", PASSWORD_MISMATCH);
    }

    errors.into_result(CleanRegistration {
      username:   username.to_owned(),
      first_name: first_name.to_owned(),
      email:      email.to_owned(),
      password:   self.password.clone(),
    })
  }
}

// ─── Profile edit ────────────────────────────────────────────────────────────

/// The user-identity half of the edit page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserEditForm {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name:  String,
  #[serde(default)]
  pub email:      String,
}

impl UserEditForm {
  pub fn clean(&self) -> Result<UserChanges, FieldErrors> {
    let mut errors = FieldErrors::new();
    let first_name = self.first_name.trim();
    let last_name = self.last_name.trim();
    let email = self.email.trim();

    check_max_len(&mut errors, "first_name", first_name, MAX_NAME_LEN);
    check_max_len(&mut errors, "last_name", last_name, MAX_NAME_LEN);
    check_optional_email(&mut errors, email);

    errors.into_result(UserChanges {
      first_name: first_name.to_owned(),
      last_name:  last_name.to_owned(),
      email:      email.to_owned(),
    })
  }
}

/// What is known about an uploaded photo; the bytes stay with the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
  pub size:      usize,
  /// Extension of the image format found in the leading bytes.
  pub extension: Option<&'static str>,
}

impl PhotoUpload {
  /// Inspect an upload. The client's file name and content type are not
  /// trusted; only the file signature decides the format.
  pub fn from_bytes(data: &[u8]) -> Self {
    Self { size: data.len(), extension: sniff_image(data) }
  }
}

/// Canonical extension of a JPEG, PNG, GIF or WebP file, judged by its
/// magic bytes.
pub fn sniff_image(data: &[u8]) -> Option<&'static str> {
  if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
    Some("jpg")
  } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
    Some("png")
  } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
    Some("gif")
  } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
    Some("webp")
  } else {
    None
  }
}

/// The profile half of the edit page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEditForm {
  /// `YYYY-MM-DD`, or empty to clear.
  pub date_of_birth: String,
  pub bio:           String,
  pub photo:         Option<PhotoUpload>,
}

/// A valid profile subform. `photo_extension` is set when a new photo was
/// uploaded and tells the caller how to name the stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanProfile {
  pub date_of_birth:   Option<NaiveDate>,
  pub bio:             String,
  pub photo_extension: Option<&'static str>,
}

impl CleanProfile {
  /// The store-level change set, given where the new photo (if any) was
  /// saved.
  pub fn into_changes(self, photo: Option<String>) -> ProfileChanges {
    ProfileChanges { date_of_birth: self.date_of_birth, bio: self.bio, photo }
  }
}

impl ProfileEditForm {
  pub fn clean(&self, max_photo_bytes: usize) -> Result<CleanProfile, FieldErrors> {
    let mut errors = FieldErrors::new();

    let raw_date = self.date_of_birth.trim();
    let date_of_birth = if raw_date.is_empty() {
      None
    } else {
      match NaiveDate::parse_from_str(raw_date, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
          errors.add("date_of_birth", INVALID_DATE);
          None
        }
      }
    };

    let bio = self.bio.trim();
    check_max_len(&mut errors, "bio", bio, MAX_BIO_LEN);

    let mut photo_extension = None;
    if let Some(photo) = &self.photo {
      match photo.extension {
        Some(_) if photo.size == 0 => errors.add("photo", "The submitted file is empty."),
        Some(_) if photo.size > max_photo_bytes => errors.add(
          "photo",
          format!("The photo may be at most {max_photo_bytes} bytes."),
        ),
        Some(ext) => photo_extension = Some(ext),
        None => errors.add("photo", INVALID_IMAGE),
      }
    }

    errors.into_result(CleanProfile {
      date_of_birth,
      bio: bio.to_owned(),
      photo_extension,
    })
  }
}
