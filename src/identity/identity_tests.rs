use super::*;

#[test]
fn role_parses_closed_set_only() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!(" Technician ".parse::<Role>().unwrap(), Role::Technician);
    assert_eq!("viewer".parse::<Role>().unwrap(), Role::Viewer);
    assert!("superuser".parse::<Role>().is_err());
    assert!("".parse::<Role>().is_err());
}

#[test]
fn identity_json_uses_console_layout() {
    let ident = Identity::new("2", "Technician User", "tech@plant.io", Role::Technician);
    let v = serde_json::to_value(&ident).unwrap();
    assert_eq!(v["name"], "Technician User");
    assert_eq!(v["role"], "technician");

    let bad = r#"{"id":"9","name":"X","email":"x@y","role":"owner"}"#;
    assert!(serde_json::from_str::<Identity>(bad).is_err());
}

#[test]
fn credentials_validation() {
    assert!(Credentials::new("admin@plant.io", "pw").validate().is_ok());
    let e = Credentials::new("   ", "pw").validate().unwrap_err();
    assert_eq!(e.code_str(), "empty_identifier");
    let e = Credentials::new("a@b", "").validate().unwrap_err();
    assert_eq!(e.code_str(), "empty_secret");
}

#[test]
fn credentials_debug_redacts_secret() {
    let s = format!("{:?}", Credentials::new("a@b", "hunter2"));
    assert!(!s.contains("hunter2"));
    let s = format!("{:?}", Profile::new("A", "a@b", "hunter2"));
    assert!(!s.contains("hunter2"));
}

#[test]
fn profile_validation() {
    assert!(Profile::new("Ana", "ana@plant.io", "pw").validate().is_ok());
    assert_eq!(Profile::new("", "ana@plant.io", "pw").validate().unwrap_err().code_str(), "empty_name");
    assert_eq!(Profile::new("Ana", "", "pw").validate().unwrap_err().code_str(), "empty_email");
    assert_eq!(Profile::new("Ana", "ana.plant.io", "pw").validate().unwrap_err().code_str(), "malformed_email");
    assert_eq!(Profile::new("Ana", "@plant.io", "pw").validate().unwrap_err().code_str(), "malformed_email");
    assert_eq!(Profile::new("Ana", "ana@plant.io", "").validate().unwrap_err().code_str(), "empty_secret");
}

#[test]
fn demo_role_resolution() {
    assert_eq!(DemoVerifier::role_for("admin@plant.io"), Role::Admin);
    assert_eq!(DemoVerifier::role_for("Tech.Lead@plant.io"), Role::Technician);
    assert_eq!(DemoVerifier::role_for("ops@plant.io"), Role::Viewer);
    // admin wins when both markers appear
    assert_eq!(DemoVerifier::role_for("techadmin@plant.io"), Role::Admin);
}

#[test]
fn tokens_are_unique_and_url_safe() {
    let a = gen_token().unwrap();
    let b = gen_token().unwrap();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn session_role_requires_authentication() {
    let ident = Identity::new("1", "Admin User", "admin@plant.io", Role::Admin);
    assert_eq!(Session::authenticated(ident).role(), Some(Role::Admin));
    assert_eq!(Session::unauthenticated().role(), None);
    assert!(Session::pending().loading);
}
