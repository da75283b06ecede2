mod common;

use common::{has_error_code, setup};
use serde_json::json;

const CREATE: &str = r#"
mutation ($input: NewEmployeeInput!) {
  hr {
    createEmployee(input: $input) {
      id fullName shortName isDismissed dismissalDate
      position { name }
      department { name }
    }
  }
}"#;

const LIST: &str = r#"
query ($filter: EmployeeFilterInput) {
  hr { employees(filter: $filter) { fullName } }
}"#;

fn names(data: &serde_json::Value) -> Vec<String> {
    data["hr"]["employees"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["fullName"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn dismissal_date_and_flag_must_agree() {
    let env = setup().await;

    let missing_date = env
        .exec(
            Some(&env.editor),
            CREATE,
            json!({ "input": { "lastName": "Kuznetsova", "firstName": "Olga", "isDismissed": true } }),
        )
        .await;
    assert!(has_error_code(&missing_date.errors, "VALIDATION"));

    let date_without_flag = env
        .exec(
            Some(&env.editor),
            CREATE,
            json!({ "input": {
                "lastName": "Kuznetsova", "firstName": "Olga", "dismissalDate": "2024-01-31"
            } }),
        )
        .await;
    assert!(has_error_code(&date_without_flag.errors, "VALIDATION"));

    let data = env
        .ok(
            &env.editor,
            CREATE,
            json!({ "input": {
                "lastName": "Kuznetsova", "firstName": "Olga",
                "isDismissed": true, "dismissalDate": "2024-01-31"
            } }),
        )
        .await;
    let created = &data["hr"]["createEmployee"];
    assert_eq!(created["isDismissed"], json!(true));
    assert_eq!(created["dismissalDate"], json!("2024-01-31"));
}

#[tokio::test]
async fn created_employee_resolves_position_and_department() {
    let env = setup().await;
    let position = env
        .ok(
            &env.editor,
            r#"mutation { hr { createPosition(input: { name: "Teacher", isTeacher: true }) { id } } }"#,
            json!({}),
        )
        .await["hr"]["createPosition"]["id"]
        .clone();
    let department = env
        .ok(
            &env.editor,
            r#"mutation { hr { createDepartment(input: { name: "Primary school" }) { id } } }"#,
            json!({}),
        )
        .await["hr"]["createDepartment"]["id"]
        .clone();

    let data = env
        .ok(
            &env.editor,
            CREATE,
            json!({ "input": {
                "lastName": "  Morozova ", "firstName": "Elena", "middleName": "Viktorovna",
                "positionId": position, "departmentId": department
            } }),
        )
        .await;
    let created = &data["hr"]["createEmployee"];
    assert_eq!(created["fullName"], json!("Morozova Elena Viktorovna"));
    assert_eq!(created["shortName"], json!("Morozova E. V."));
    assert_eq!(created["position"]["name"], json!("Teacher"));
    assert_eq!(created["department"]["name"], json!("Primary school"));

    let unknown = env
        .exec(
            Some(&env.editor),
            CREATE,
            json!({ "input": {
                "lastName": "Lebedev", "firstName": "Nikolai",
                "positionId": uuid::Uuid::new_v4().to_string()
            } }),
        )
        .await;
    assert!(has_error_code(&unknown.errors, "VALIDATION"));
}

#[tokio::test]
async fn duplicate_identity_is_a_conflict() {
    let env = setup().await;
    let input = json!({ "input": {
        "lastName": "Sokolov", "firstName": "Andrei", "middleName": "Pavlovich",
        "birthDate": "1985-11-02"
    } });
    env.ok(&env.editor, CREATE, input.clone()).await;
    let again = env.exec(Some(&env.editor), CREATE, input).await;
    assert!(has_error_code(&again.errors, "CONFLICT"));
}

#[tokio::test]
async fn listing_hides_dismissed_staff_unless_asked() {
    let env = setup().await;
    for (last, dismissed) in [("Alekseev", false), ("Borisova", true), ("Vasiliev", false)] {
        let mut input = json!({ "lastName": last, "firstName": "Test" });
        if dismissed {
            input["isDismissed"] = json!(true);
            input["dismissalDate"] = json!("2023-05-01");
        }
        env.ok(&env.editor, CREATE, json!({ "input": input })).await;
    }

    let active = env.ok(&env.viewer, LIST, json!({})).await;
    assert_eq!(names(&active), ["Alekseev Test", "Vasiliev Test"]);

    let all = env
        .ok(&env.viewer, LIST, json!({ "filter": { "includeDismissed": true } }))
        .await;
    assert_eq!(names(&all).len(), 3);

    let searched = env
        .ok(&env.viewer, LIST, json!({ "filter": { "q": "VASIL" } }))
        .await;
    assert_eq!(names(&searched), ["Vasiliev Test"]);
}

#[tokio::test]
async fn update_can_clear_nullable_fields_and_dismiss() {
    let env = setup().await;
    let data = env
        .ok(
            &env.editor,
            CREATE,
            json!({ "input": { "lastName": "Orlov", "firstName": "Pavel", "birthDate": "1980-04-02" } }),
        )
        .await;
    let id = data["hr"]["createEmployee"]["id"].clone();

    let update = r#"
    mutation ($input: UpdateEmployeeInput!) {
      hr { updateEmployee(input: $input) { birthDate isDismissed dismissalDate } }
    }"#;
    let half = env
        .exec(
            Some(&env.editor),
            update,
            json!({ "input": { "id": id, "isDismissed": true } }),
        )
        .await;
    assert!(has_error_code(&half.errors, "VALIDATION"));

    let updated = env
        .ok(
            &env.editor,
            update,
            json!({ "input": {
                "id": id, "birthDate": null, "isDismissed": true, "dismissalDate": "2025-02-28"
            } }),
        )
        .await;
    let employee = &updated["hr"]["updateEmployee"];
    assert!(employee["birthDate"].is_null());
    assert_eq!(employee["dismissalDate"], json!("2025-02-28"));
}

#[tokio::test]
async fn viewers_cannot_edit_and_paging_is_bounded() {
    let env = setup().await;
    let denied = env
        .exec(
            Some(&env.viewer),
            CREATE,
            json!({ "input": { "lastName": "Nobody", "firstName": "Here" } }),
        )
        .await;
    assert!(has_error_code(&denied.errors, "FORBIDDEN"));

    let too_many = env
        .exec(
            Some(&env.viewer),
            r#"{ hr { employees(first: 500) { id } } }"#,
            json!({}),
        )
        .await;
    assert!(has_error_code(&too_many.errors, "LIMIT_EXCEEDED"));

    let anonymous = env.exec(None, LIST, json!({})).await;
    assert!(has_error_code(&anonymous.errors, "UNAUTHENTICATED"));
}
