use sitework::auth::user::{initials, Permission, User, UserRole};

#[test]
fn test_user_creation() {
    let user = User::new("Sarah Johnson".to_string(), " Sarah@Example.COM ", UserRole::User, "hash".to_string());
    assert_eq!(user.email, "sarah@example.com");
    assert_eq!(user.avatar, "SJ");
    assert_eq!(user.company, None);
    assert!(!user.id.is_empty());
}

#[test]
fn test_profile_hides_password_hash() {
    let user = User::new("A B".to_string(), "a@b.co", UserRole::Admin, "secret-hash".to_string());
    let json = serde_json::to_value(user.profile()).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["role"], "admin");
    assert_eq!(json["permissions"].as_array().unwrap().len(), Permission::ALL.len());
}

#[test]
fn test_role_permissions() {
    // User has the resource permissions only
    let user = UserRole::User;
    assert!(user.has_permission(Permission::ReadProjects));
    assert!(user.has_permission(Permission::UploadFiles));
    assert!(user.has_permission(Permission::ReadAnalytics));
    assert!(!user.has_permission(Permission::ReadReports));
    assert!(!user.has_permission(Permission::ManageUsers));

    // Manager adds reports and team management
    let manager = UserRole::Manager;
    assert!(manager.has_permission(Permission::ReadReports));
    assert!(manager.has_permission(Permission::ManageTeam));
    assert!(!manager.has_permission(Permission::ManageUsers));
    assert!(!manager.has_permission(Permission::ManageSettings));

    // Admin has everything
    for permission in Permission::ALL {
        assert!(UserRole::Admin.has_permission(permission), "admin lacks {}", permission);
    }
}

#[test]
fn test_roles_are_nested() {
    for permission in UserRole::User.permissions() {
        assert!(UserRole::Manager.has_permission(*permission));
    }
    for permission in UserRole::Manager.permissions() {
        assert!(UserRole::Admin.has_permission(*permission));
    }
}

#[test]
fn test_strict_parsing() {
    assert_eq!("manager".parse::<UserRole>().unwrap(), UserRole::Manager);
    assert!("superuser".parse::<UserRole>().is_err());
    assert!("Admin ".parse::<UserRole>().is_err());
    assert_eq!("manage:users".parse::<Permission>().unwrap(), Permission::ManageUsers);
    assert!("manage:everything".parse::<Permission>().is_err());
}

#[test]
fn test_initials() {
    assert_eq!(initials("mike chen"), "MC");
    assert_eq!(initials("Cher"), "C");
    assert_eq!(initials("Mary Ann Smith"), "MA");
    assert_eq!(initials("   "), "U");
}
