use crate::common::*;

#[test]
fn test_activate_license_records_row_and_flags_license() {
    let mut conn = setup_test_db();
    let license = create_test_license(&conn, "KEY-ACT", None);

    let activation = queries::activate_license(&mut conn, &license.id, "TERM-1").unwrap();
    assert_eq!(activation.license_id, license.id);
    assert_eq!(activation.terminal_id, "TERM-1");
    assert!(activation.activated_at > 0);

    let reloaded = queries::get_license_by_id(&conn, &license.id).unwrap().unwrap();
    assert!(reloaded.activated);
    assert_eq!(reloaded.activated_at, Some(activation.activated_at));
}

#[test]
fn test_activation_of_missing_license_fails_without_side_effects() {
    let mut conn = setup_test_db();

    let result = queries::activate_license(&mut conn, "no-such-license", "TERM-1");
    assert!(matches!(result, Err(AppError::ForeignKey(_))), "got {:?}", result);

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM license_activations", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn test_record_activation_leaves_license_flag_alone() {
    let conn = setup_test_db();
    let license = create_test_license(&conn, "KEY-REC", None);

    queries::record_activation(&conn, &license.id, "TERM-1").unwrap();

    let reloaded = queries::get_license_by_id(&conn, &license.id).unwrap().unwrap();
    assert!(!reloaded.activated);
    assert_eq!(queries::list_activations_for_license(&conn, &license.id).unwrap().len(), 1);
}

#[test]
fn test_repeat_activations_and_many_terminals_are_allowed() {
    let mut conn = setup_test_db();
    let license = create_test_license(&conn, "KEY-MANY", None);

    queries::activate_license(&mut conn, &license.id, "TERM-1").unwrap();
    queries::activate_license(&mut conn, &license.id, "TERM-1").unwrap();
    queries::activate_license(&mut conn, &license.id, "TERM-2").unwrap();
    queries::activate_license(&mut conn, &license.id, "TERM-3").unwrap();

    let activations = queries::list_activations_for_license(&conn, &license.id).unwrap();
    assert_eq!(activations.len(), 4);
    assert_eq!(activations[0].terminal_id, "TERM-3");
    assert_eq!(activations[3].terminal_id, "TERM-1");
    assert_eq!(queries::count_distinct_terminals(&conn, &license.id).unwrap(), 3);
}

#[test]
fn test_last_activation_terminal() {
    let mut conn = setup_test_db();
    let license = create_test_license(&conn, "KEY-LAST", None);
    let other = create_test_license(&conn, "KEY-OTHER", None);

    assert_eq!(queries::get_last_activation_terminal(&conn, &license.id).unwrap(), None);

    queries::activate_license(&mut conn, &license.id, "TERM-A").unwrap();
    queries::activate_license(&mut conn, &other.id, "TERM-X").unwrap();
    queries::activate_license(&mut conn, &license.id, "TERM-B").unwrap();

    assert_eq!(
        queries::get_last_activation_terminal(&conn, &license.id).unwrap().as_deref(),
        Some("TERM-B")
    );
    assert_eq!(
        queries::get_last_activation_terminal(&conn, &other.id).unwrap().as_deref(),
        Some("TERM-X")
    );
}

#[test]
fn test_terminal_id_is_required() {
    let conn = setup_test_db();
    let license = create_test_license(&conn, "KEY-TERM", None);
    let err: AppError = conn
        .execute(
            "INSERT INTO license_activations (id, license_id) VALUES ('a1', ?1)",
            [&license.id],
        )
        .unwrap_err()
        .into();
    assert!(matches!(err, AppError::MissingValue(_)), "got {:?}", err);
}
