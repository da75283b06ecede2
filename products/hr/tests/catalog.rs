mod common;

use common::{TestEnv, has_error_code, setup};
use serde_json::{Value, json};

const CREATE_DEPARTMENT: &str = r#"
mutation ($input: NewDepartmentInput!) {
  hr { createDepartment(input: $input) { id name } }
}"#;

const UPDATE_DEPARTMENT: &str = r#"
mutation ($input: UpdateDepartmentInput!) {
  hr { updateDepartment(input: $input) { id name description } }
}"#;

const CREATE_POSITION: &str = r#"
mutation ($input: NewPositionInput!) {
  hr { createPosition(input: $input) { id name isTeacher } }
}"#;

const UPDATE_POSITION: &str = r#"
mutation ($input: UpdatePositionInput!) {
  hr { updatePosition(input: $input) { id name isManager isTeacher } }
}"#;

const CREATE_PROGRAM: &str = r#"
mutation ($input: NewTrainingProgramInput!) {
  hr { createTrainingProgram(input: $input) { id name recurrenceYears } }
}"#;

const UPDATE_PROGRAM: &str = r#"
mutation ($input: UpdateTrainingProgramInput!) {
  hr { updateTrainingProgram(input: $input) { id name recurrenceYears } }
}"#;

async fn create(env: &TestEnv, mutation: &str, field: &str, input: Value) -> String {
    let data = env.ok(&env.editor, mutation, json!({ "input": input })).await;
    data["hr"][field]["id"].as_str().unwrap().to_string()
}

async fn create_named(env: &TestEnv, mutation: &str, field: &str, name: &str) -> String {
    create(env, mutation, field, json!({ "name": name })).await
}

#[tokio::test]
async fn names_are_unique_regardless_of_case() {
    let env = setup().await;
    let cases = [
        (CREATE_DEPARTMENT, "createDepartment", "Library", " library "),
        (CREATE_POSITION, "createPosition", "Teacher", "TEACHER"),
        (CREATE_PROGRAM, "createTrainingProgram", "First aid", "first AID"),
    ];

    for (mutation, field, first, clash) in cases {
        create(&env, mutation, field, json!({ "name": first })).await;
        let response = env
            .exec(Some(&env.editor), mutation, json!({ "input": { "name": clash } }))
            .await;
        assert!(
            has_error_code(&response.errors, "CONFLICT"),
            "{field}: {:?}",
            response.errors
        );
    }
}

#[tokio::test]
async fn recurrence_outside_one_to_fifty_years_is_rejected() {
    let env = setup().await;

    for years in [0, 51] {
        let response = env
            .exec(
                Some(&env.editor),
                CREATE_PROGRAM,
                json!({ "input": { "name": format!("Drill {years}"), "recurrenceYears": years } }),
            )
            .await;
        assert!(has_error_code(&response.errors, "VALIDATION"), "{years}");
    }

    let data = env
        .ok(
            &env.editor,
            CREATE_PROGRAM,
            json!({ "input": { "name": "Fire drill", "recurrenceYears": 50 } }),
        )
        .await;
    assert_eq!(data["hr"]["createTrainingProgram"]["recurrenceYears"], 50);
}

#[tokio::test]
async fn department_rename_keeps_own_name_and_refuses_a_sibling() {
    let env = setup().await;
    let library = create_named(&env, CREATE_DEPARTMENT, "createDepartment", "Library").await;
    create_named(&env, CREATE_DEPARTMENT, "createDepartment", "Kitchen").await;

    let data = env
        .ok(
            &env.editor,
            UPDATE_DEPARTMENT,
            json!({ "input": { "id": library, "name": "LIBRARY", "description": "Ground floor" } }),
        )
        .await;
    assert_eq!(data["hr"]["updateDepartment"]["name"], "LIBRARY");
    assert_eq!(data["hr"]["updateDepartment"]["description"], "Ground floor");

    let clash = env
        .exec(
            Some(&env.editor),
            UPDATE_DEPARTMENT,
            json!({ "input": { "id": library, "name": "kitchen" } }),
        )
        .await;
    assert!(has_error_code(&clash.errors, "CONFLICT"));

    let cleared = env
        .ok(
            &env.editor,
            UPDATE_DEPARTMENT,
            json!({ "input": { "id": library, "description": null } }),
        )
        .await;
    assert_eq!(cleared["hr"]["updateDepartment"]["description"], Value::Null);
}

#[tokio::test]
async fn position_rename_keeps_own_name_and_refuses_a_sibling() {
    let env = setup().await;
    let teacher = create_named(&env, CREATE_POSITION, "createPosition", "Teacher").await;
    create(
        &env,
        CREATE_POSITION,
        "createPosition",
        json!({ "name": "Director", "isManager": true }),
    )
    .await;

    let data = env
        .ok(
            &env.editor,
            UPDATE_POSITION,
            json!({ "input": { "id": teacher, "name": "teacher", "isTeacher": true } }),
        )
        .await;
    let updated = &data["hr"]["updatePosition"];
    assert_eq!(updated["name"], "teacher");
    assert_eq!(updated["isTeacher"], true);
    assert_eq!(updated["isManager"], false);

    let clash = env
        .exec(
            Some(&env.editor),
            UPDATE_POSITION,
            json!({ "input": { "id": teacher, "name": "DIRECTOR" } }),
        )
        .await;
    assert!(has_error_code(&clash.errors, "CONFLICT"));

    let denied = env
        .exec(
            Some(&env.viewer),
            UPDATE_POSITION,
            json!({ "input": { "id": teacher, "name": "Tutor" } }),
        )
        .await;
    assert!(has_error_code(&denied.errors, "FORBIDDEN"));
}

#[tokio::test]
async fn program_update_checks_names_and_recurrence() {
    let env = setup().await;
    let first_aid = create(
        &env,
        CREATE_PROGRAM,
        "createTrainingProgram",
        json!({ "name": "First aid", "recurrenceYears": 3 }),
    )
    .await;
    create_named(&env, CREATE_PROGRAM, "createTrainingProgram", "Fire safety").await;

    let data = env
        .ok(
            &env.editor,
            UPDATE_PROGRAM,
            json!({ "input": { "id": first_aid, "name": "FIRST AID", "recurrenceYears": 5 } }),
        )
        .await;
    assert_eq!(data["hr"]["updateTrainingProgram"]["name"], "FIRST AID");
    assert_eq!(data["hr"]["updateTrainingProgram"]["recurrenceYears"], 5);

    let clash = env
        .exec(
            Some(&env.editor),
            UPDATE_PROGRAM,
            json!({ "input": { "id": first_aid, "name": "fire SAFETY" } }),
        )
        .await;
    assert!(has_error_code(&clash.errors, "CONFLICT"));

    let out_of_range = env
        .exec(
            Some(&env.editor),
            UPDATE_PROGRAM,
            json!({ "input": { "id": first_aid, "recurrenceYears": 51 } }),
        )
        .await;
    assert!(has_error_code(&out_of_range.errors, "VALIDATION"));

    let one_off = env
        .ok(
            &env.editor,
            UPDATE_PROGRAM,
            json!({ "input": { "id": first_aid, "recurrenceYears": null } }),
        )
        .await;
    assert_eq!(one_off["hr"]["updateTrainingProgram"]["recurrenceYears"], Value::Null);
}

#[tokio::test]
async fn training_record_update_patches_fields_and_guards_duplicates() {
    let env = setup().await;
    let program = create(
        &env,
        CREATE_PROGRAM,
        "createTrainingProgram",
        json!({ "name": "First aid", "recurrenceYears": 3 }),
    )
    .await;
    let employee = env
        .ok(
            &env.editor,
            r#"mutation ($input: NewEmployeeInput!) { hr { createEmployee(input: $input) { id } } }"#,
            json!({ "input": { "lastName": "Ivanova", "firstName": "Anna" } }),
        )
        .await["hr"]["createEmployee"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let create_record = r#"
    mutation ($input: NewTrainingRecordInput!) {
      hr { createTrainingRecord(input: $input) { id } }
    }"#;
    let mut ids = Vec::new();
    for date in ["2022-03-01", "2024-03-01"] {
        let data = env
            .ok(
                &env.editor,
                create_record,
                json!({ "input": {
                    "employeeId": employee, "trainingProgramId": program, "completionDate": date
                } }),
            )
            .await;
        let id = data["hr"]["createTrainingRecord"]["id"].as_str().unwrap();
        ids.push(id.to_string());
    }

    let update = r#"
    mutation ($input: UpdateTrainingRecordInput!) {
      hr { updateTrainingRecord(input: $input) { id completionDate details isVerified } }
    }"#;

    let data = env
        .ok(
            &env.editor,
            update,
            json!({ "input": {
                "id": ids[0], "completionDate": "2022-03-01",
                "details": "Certificate 17", "isVerified": true
            } }),
        )
        .await;
    let record = &data["hr"]["updateTrainingRecord"];
    assert_eq!(record["completionDate"], "2022-03-01");
    assert_eq!(record["details"], "Certificate 17");
    assert_eq!(record["isVerified"], true);

    let duplicate = env
        .exec(
            Some(&env.editor),
            update,
            json!({ "input": { "id": ids[0], "completionDate": "2024-03-01" } }),
        )
        .await;
    assert!(has_error_code(&duplicate.errors, "CONFLICT"));

    let moved = env
        .ok(
            &env.editor,
            update,
            json!({ "input": { "id": ids[0], "completionDate": "2021-09-15", "details": null } }),
        )
        .await;
    assert_eq!(moved["hr"]["updateTrainingRecord"]["completionDate"], "2021-09-15");
    assert_eq!(moved["hr"]["updateTrainingRecord"]["details"], Value::Null);
}
