mod common;

use axum::http::StatusCode;
use common::{TestApp, PASSWORD};

#[tokio::test]
async fn signup_validation() {
    let mut app = TestApp::new();
    app.signup("Bob", "dupe@example.com", PASSWORD).await;

    let cases = [
        ("Bob", "bob@example.com", "validPa$$word", StatusCode::SEE_OTHER, None),
        ("", "bob2@example.com", "validPa$$word", StatusCode::OK, Some("This field cannot be blank")),
        ("Bob", "", "validPa$$word", StatusCode::OK, Some("This field cannot be blank")),
        ("Bob", "bob3@example.com", "", StatusCode::OK, Some("This field cannot be blank")),
        ("Bob", "bob@example.", "validPa$$word", StatusCode::OK, Some("This field is invalid")),
        ("Bob", "bob@example", "validPa$$word", StatusCode::SEE_OTHER, None),
        ("Bob", "bob4@example.com", "pa$$word", StatusCode::OK, Some("This field is too short (minimum is 10 characters)")),
        ("Bob", "dupe@example.com", "validPa$$word", StatusCode::OK, Some("Address is already in use")),
    ];

    for (name, email, password, status, message) in cases {
        let response = app.signup(name, email, password).await;
        assert_eq!(response.status, status, "{email}");
        match message {
            Some(message) => assert!(response.body.contains(message), "{email}: {message}"),
            None => assert_eq!(response.location(), Some("/user/login")),
        }
    }
}

#[tokio::test]
async fn duplicate_signup_retains_non_password_fields() {
    let mut app = TestApp::new();
    let response = app.signup("admin", "admin@localhost", "password12345").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let response = app.get("/user/login").await;
    assert!(response
        .body
        .contains("Your signup was successful. Please log in."));

    let response = app.signup("admin", "admin@localhost", "password12345").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Address is already in use"));
    assert!(response.body.contains(r#"value="admin@localhost""#));
    assert!(response.body.contains(r#"value="admin""#));
    assert!(!response.body.contains("password12345"));
}

#[tokio::test]
async fn signup_without_valid_csrf_token_is_rejected() {
    let mut app = TestApp::new();
    app.get("/user/signup").await;

    let response = app
        .post_form(
            "/user/signup",
            &[
                ("csrf_token", "wrongToken"),
                ("name", "Bob"),
                ("email", "bob@example.com"),
                ("password", "validPa$$word"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_form(
            "/user/signup",
            &[("name", "Bob"), ("email", "bob@example.com")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Nothing was stored, so the address is still free.
    let response = app.signup("Bob", "bob@example.com", "validPa$$word").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let mut app = TestApp::new();
    app.signup("Alice", "alice@example.com", PASSWORD).await;

    for (email, password) in [
        ("alice@example.com", "wrong-password"),
        ("nobody@example.com", PASSWORD),
        ("", ""),
    ] {
        let response = app.login(email, password).await;
        assert_eq!(response.status, StatusCode::OK, "{email}");
        assert!(response.body.contains("Email or Password is incorrect"));
    }
}

#[tokio::test]
async fn login_defaults_to_create_page_and_cycles_session() {
    let mut app = TestApp::new();
    app.signup("Alice", "alice@example.com", PASSWORD).await;
    let before = app.csrf_token("/user/login").await;

    let response = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/snippet/create"));
    assert!(response.header("set-cookie").is_some());

    let after = app.csrf_token("/user/profile").await;
    assert_ne!(before, after, "token is rotated on login");
}

#[tokio::test]
async fn logout_flow() {
    let mut app = TestApp::new();
    app.logged_in_as("alice@example.com").await;

    let response = app.submit("/", "/user/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));

    let response = app.get("/").await;
    assert!(response.body.contains("You&#x27;ve been logged out"));
    assert!(response.body.contains("/user/login"));

    let response = app.get("/user/profile").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
}

#[tokio::test]
async fn anonymous_form_submission_is_not_a_login_destination() {
    let mut app = TestApp::new();
    app.signup("Alice", "alice@example.com", PASSWORD).await;

    let response = app.submit("/", "/user/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    let response = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/snippet/create"));
}

#[tokio::test]
async fn profile_shows_current_user() {
    let mut app = TestApp::new();
    app.logged_in_as("alice@example.com").await;

    let response = app.get("/user/profile").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Alice"));
    assert!(response.body.contains("alice@example.com"));
}

#[tokio::test]
async fn change_password_flow() {
    let mut app = TestApp::new();
    app.logged_in_as("alice@example.com").await;

    let page = "/user/change-password";
    let cases = [
        ("", "new-password-1", "new-password-1", "This field cannot be blank"),
        (PASSWORD, "short", "short", "This field is too short (minimum is 10 characters)"),
        (PASSWORD, "new-password-1", "new-password-2", "Passwords do not match"),
        ("not-my-password", "new-password-1", "new-password-1", "Current password is incorrect"),
    ];
    for (current, new, confirm, message) in cases {
        let response = app
            .submit(
                page,
                page,
                &[
                    ("currentPassword", current),
                    ("newPassword", new),
                    ("confirmPassword", confirm),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{message}");
        assert!(response.body.contains(message), "{message}");
    }

    let response = app
        .submit(
            page,
            page,
            &[
                ("currentPassword", PASSWORD),
                ("newPassword", "new-password-1"),
                ("confirmPassword", "new-password-1"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/profile"));

    let response = app.get("/user/profile").await;
    assert!(response.body.contains("Your password has been updated!"));

    app.submit("/", "/user/logout", &[]).await;
    let response = app.login("alice@example.com", PASSWORD).await;
    assert!(response.body.contains("Email or Password is incorrect"));
    let response = app.login("alice@example.com", "new-password-1").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn deactivated_user_is_logged_out_softly() {
    let mut app = TestApp::new();
    app.logged_in_as("alice@example.com").await;
    assert!(app.users.set_active(1, false));

    let response = app.get("/user/profile").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));

    // Public pages still render for the now anonymous session.
    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("/user/signup"));
}

#[tokio::test]
async fn deleted_user_is_logged_out_softly() {
    let mut app = TestApp::new();
    app.logged_in_as("alice@example.com").await;
    assert!(app.users.delete(1));

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/snippet/create").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}
