mod common;

use common::{has_error_code, provision, setup};
use platform_authz::Role;
use serde_json::{Value, json};

const CREATE_DEPARTMENT: &str = r#"
mutation ($name: String!) {
  hr { createDepartment(input: { name: $name }) { id name } }
}"#;

const DELETE_DEPARTMENT: &str = r#"
mutation ($id: ID!, $reason: String) {
  hr {
    deleteDepartment(id: $id, reason: $reason) {
      deleted
      request { id status targetKind targetLabel reason }
    }
  }
}"#;

const REVIEW: &str = r#"
mutation ($id: ID!, $decision: ReviewDecision!) {
  hr { reviewDeletionRequest(id: $id, decision: $decision) { id status reviewedBy reviewedAt } }
}"#;

const DEPARTMENT: &str = r#"query ($id: ID!) { hr { department(id: $id) { id name } } }"#;

async fn department(env: &common::TestEnv, name: &str) -> String {
    let data = env.ok(&env.editor, CREATE_DEPARTMENT, json!({ "name": name })).await;
    data["hr"]["createDepartment"]["id"].as_str().unwrap().to_string()
}

fn request_of(data: &Value) -> &Value {
    &data["hr"]["deleteDepartment"]["request"]
}

#[tokio::test]
async fn editor_request_is_applied_when_moderator_approves() {
    let env = setup().await;
    let id = department(&env, "Library").await;

    let data = env
        .ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id, "reason": "merged" }))
        .await;
    assert_eq!(data["hr"]["deleteDepartment"]["deleted"], json!(false));
    let request = request_of(&data);
    assert_eq!(request["status"], json!("PENDING"));
    assert_eq!(request["targetKind"], json!("DEPARTMENT"));
    assert_eq!(request["targetLabel"], json!("Library"));
    assert_eq!(request["reason"], json!("merged"));
    let request_id = request["id"].as_str().unwrap().to_string();

    // still readable while pending
    env.ok(&env.viewer, DEPARTMENT, json!({ "id": id })).await;

    let reviewed = env
        .ok(
            &env.moderator,
            REVIEW,
            json!({ "id": request_id, "decision": "APPROVE" }),
        )
        .await;
    let review = &reviewed["hr"]["reviewDeletionRequest"];
    assert_eq!(review["status"], json!("APPROVED"));
    assert_eq!(review["reviewedBy"], json!(env.moderator.user_id.to_string()));
    assert!(review["reviewedAt"].is_string());

    let gone = env.exec(Some(&env.viewer), DEPARTMENT, json!({ "id": id })).await;
    assert!(has_error_code(&gone.errors, "NOT_FOUND"));
}

#[tokio::test]
async fn repeated_editor_requests_reuse_the_pending_one() {
    let env = setup().await;
    let id = department(&env, "Archive").await;

    let first = env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })).await;
    let second = env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })).await;
    assert_eq!(request_of(&first)["id"], request_of(&second)["id"]);

    let pending = env
        .ok(
            &env.moderator,
            r#"{ hr { deletionRequests(status: PENDING) { id targetLabel } } }"#,
            json!({}),
        )
        .await;
    assert_eq!(pending["hr"]["deletionRequests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_keeps_the_record_and_cannot_be_reviewed_twice() {
    let env = setup().await;
    let id = department(&env, "Canteen").await;
    let data = env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })).await;
    let request_id = request_of(&data)["id"].as_str().unwrap().to_string();

    let rejected = env
        .ok(
            &env.moderator,
            REVIEW,
            json!({ "id": request_id, "decision": "REJECT" }),
        )
        .await;
    assert_eq!(
        rejected["hr"]["reviewDeletionRequest"]["status"],
        json!("REJECTED")
    );
    env.ok(&env.viewer, DEPARTMENT, json!({ "id": id })).await;

    let again = env
        .exec(
            Some(&env.moderator),
            REVIEW,
            json!({ "id": request_id, "decision": "APPROVE" }),
        )
        .await;
    assert!(has_error_code(&again.errors, "CONFLICT"));
    env.ok(&env.viewer, DEPARTMENT, json!({ "id": id })).await;
}

#[tokio::test]
async fn concurrent_reviews_settle_on_a_single_decision() {
    let env = setup().await;
    let second_moderator = provision(&env.db, "mto2", Role::Moderator).await;
    let id = department(&env, "Gym").await;
    let data = env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })).await;
    let request_id = request_of(&data)["id"].as_str().unwrap().to_string();

    let (approve, reject) = tokio::join!(
        env.exec(
            Some(&env.moderator),
            REVIEW,
            json!({ "id": request_id, "decision": "APPROVE" }),
        ),
        env.exec(
            Some(&second_moderator),
            REVIEW,
            json!({ "id": request_id, "decision": "REJECT" }),
        ),
    );
    let (winner, loser) = if approve.errors.is_empty() {
        (approve, reject)
    } else {
        (reject, approve)
    };
    assert!(winner.errors.is_empty(), "errors: {:?}", winner.errors);
    assert!(has_error_code(&loser.errors, "CONFLICT"));

    let winner = winner.data.into_json().unwrap();
    let decided = winner["hr"]["reviewDeletionRequest"]["status"].clone();
    let stored = env
        .ok(
            &env.moderator,
            r#"query ($id: ID!) { hr { deletionRequest(id: $id) { status } } }"#,
            json!({ "id": request_id }),
        )
        .await;
    assert_eq!(stored["hr"]["deletionRequest"]["status"], decided);

    let target = env.exec(Some(&env.viewer), DEPARTMENT, json!({ "id": id })).await;
    if decided == json!("APPROVED") {
        assert!(has_error_code(&target.errors, "NOT_FOUND"));
    } else {
        assert!(target.errors.is_empty(), "errors: {:?}", target.errors);
    }
}

#[tokio::test]
async fn concurrent_editors_share_one_pending_request() {
    let env = setup().await;
    let second_editor = provision(&env.db, "oob", Role::Editor).await;
    let id = department(&env, "Print room").await;

    let (first, second) = tokio::join!(
        env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })),
        env.ok(&second_editor, DELETE_DEPARTMENT, json!({ "id": id })),
    );
    assert_eq!(request_of(&first)["id"], request_of(&second)["id"]);

    let pending = env
        .ok(
            &env.moderator,
            r#"{ hr { deletionRequests(status: PENDING, targetKind: DEPARTMENT) { id } } }"#,
            json!({}),
        )
        .await;
    assert_eq!(pending["hr"]["deletionRequests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn moderator_deletes_directly_and_closes_pending_requests() {
    let env = setup().await;
    let id = department(&env, "Workshop").await;
    let filed = env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })).await;
    let request_id = request_of(&filed)["id"].as_str().unwrap().to_string();

    let data = env.ok(&env.moderator, DELETE_DEPARTMENT, json!({ "id": id })).await;
    assert_eq!(data["hr"]["deleteDepartment"]["deleted"], json!(true));
    assert!(data["hr"]["deleteDepartment"]["request"].is_null());

    let request = env
        .ok(
            &env.moderator,
            r#"query ($id: ID!) { hr { deletionRequest(id: $id) { status reviewedBy } } }"#,
            json!({ "id": request_id }),
        )
        .await;
    assert_eq!(request["hr"]["deletionRequest"]["status"], json!("APPROVED"));
    assert_eq!(
        request["hr"]["deletionRequest"]["reviewedBy"],
        json!(env.moderator.user_id.to_string())
    );
}

#[tokio::test]
async fn viewers_and_editors_cannot_bypass_review() {
    let env = setup().await;
    let id = department(&env, "Garage").await;

    let viewer = env
        .exec(Some(&env.viewer), DELETE_DEPARTMENT, json!({ "id": id }))
        .await;
    assert!(has_error_code(&viewer.errors, "FORBIDDEN"));

    let data = env.ok(&env.editor, DELETE_DEPARTMENT, json!({ "id": id })).await;
    let request_id = request_of(&data)["id"].as_str().unwrap().to_string();
    let editor_review = env
        .exec(
            Some(&env.editor),
            REVIEW,
            json!({ "id": request_id, "decision": "APPROVE" }),
        )
        .await;
    assert!(has_error_code(&editor_review.errors, "FORBIDDEN"));

    let anonymous = env.exec(None, DELETE_DEPARTMENT, json!({ "id": id })).await;
    assert!(has_error_code(&anonymous.errors, "UNAUTHENTICATED"));
}

#[tokio::test]
async fn deleting_a_missing_target_is_not_found() {
    let env = setup().await;
    let missing = uuid::Uuid::new_v4().to_string();
    let response = env
        .exec(Some(&env.editor), DELETE_DEPARTMENT, json!({ "id": missing }))
        .await;
    assert!(has_error_code(&response.errors, "NOT_FOUND"));
}

#[tokio::test]
async fn approving_an_employee_removes_their_training_records() {
    let env = setup().await;
    let employee = env
        .ok(
            &env.editor,
            r#"mutation { hr { createEmployee(input: { lastName: "Orlov", firstName: "Pavel" }) { id } } }"#,
            json!({}),
        )
        .await["hr"]["createEmployee"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let program = env
        .ok(
            &env.editor,
            r#"mutation { hr { createTrainingProgram(input: { name: "First aid", recurrenceYears: 3 }) { id } } }"#,
            json!({}),
        )
        .await["hr"]["createTrainingProgram"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    env.ok(
        &env.editor,
        r#"mutation ($e: ID!, $p: ID!) {
          hr { createTrainingRecord(input: { employeeId: $e, trainingProgramId: $p, completionDate: "2024-03-01" }) { id } }
        }"#,
        json!({ "e": employee, "p": program }),
    )
    .await;

    let filed = env
        .ok(
            &env.editor,
            r#"mutation ($id: ID!) { hr { deleteEmployee(id: $id) { request { id targetLabel } } } }"#,
            json!({ "id": employee }),
        )
        .await;
    let request = &filed["hr"]["deleteEmployee"]["request"];
    assert_eq!(request["targetLabel"], json!("Orlov Pavel"));
    env.ok(
        &env.moderator,
        REVIEW,
        json!({ "id": request["id"], "decision": "APPROVE" }),
    )
    .await;

    let records = env
        .ok(
            &env.viewer,
            r#"query ($p: ID!) { hr { trainingRecords(filter: { trainingProgramId: $p }) { id } } }"#,
            json!({ "p": program }),
        )
        .await;
    assert!(records["hr"]["trainingRecords"].as_array().unwrap().is_empty());
}
