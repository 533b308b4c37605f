//! Input validation shared by client and server.
//!
//! The client runs these as a pre-flight gate before any network call;
//! the server runs the same checks authoritatively at the API boundary.

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const FULL_NAME_MAX: usize = 100;
pub const CIRCLE_NAME_MIN: usize = 3;
pub const CIRCLE_NAME_MAX: usize = 50;
pub const DESCRIPTION_MAX: usize = 255;
pub const POST_TITLE_MAX: usize = 100;

/// Checks a username against the 3–50 character constraint.
pub fn username(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        ));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), String> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(format!("Password must be at least {PASSWORD_MIN} characters"));
    }
    Ok(())
}

/// Minimal shape check: nonempty local part, nonempty domain with a dot.
pub fn email(value: &str) -> Result<(), String> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

pub fn full_name(value: &str) -> Result<(), String> {
    if value.chars().count() > FULL_NAME_MAX {
        return Err(format!("Full name must be at most {FULL_NAME_MAX} characters"));
    }
    Ok(())
}

/// Checks a circle name against the 3–50 character constraint.
pub fn circle_name(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if !(CIRCLE_NAME_MIN..=CIRCLE_NAME_MAX).contains(&len) {
        return Err(format!(
            "Circle name must be between {CIRCLE_NAME_MIN} and {CIRCLE_NAME_MAX} characters"
        ));
    }
    Ok(())
}

pub fn description(value: &str) -> Result<(), String> {
    if value.chars().count() > DESCRIPTION_MAX {
        return Err(format!("Description must be at most {DESCRIPTION_MAX} characters"));
    }
    Ok(())
}

pub fn post_title(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if len == 0 || len > POST_TITLE_MAX {
        return Err(format!("Title must be between 1 and {POST_TITLE_MAX} characters"));
    }
    Ok(())
}

pub fn post_content(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("Content must not be empty".to_string());
    }
    Ok(())
}
