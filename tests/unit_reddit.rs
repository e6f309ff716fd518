// Unit tests for the Reddit API models.
//
// Deserialization of listings, token and error envelopes, plus permalink
// rendering. No network access.

use sfwbot::reddit::models::{AccessToken, JsonEnvelope, Listing, Submission};

#[test]
fn deserialize_new_listing() {
    let json = r#"{
        "kind": "Listing",
        "data": {
            "after": "t3_bbb",
            "children": [
                {"kind": "t3", "data": {
                    "name": "t3_aaa",
                    "url": "https://i.redd.it/aaa.jpg",
                    "permalink": "/r/pics/comments/aaa/a_cat/",
                    "approved_by": null,
                    "title": "a cat"
                }},
                {"kind": "t3", "data": {
                    "name": "t3_bbb",
                    "url": "https://imgur.com/bbb",
                    "permalink": "/r/pics/comments/bbb/a_dog/",
                    "approved_by": "a_moderator",
                    "over_18": true
                }}
            ]
        }
    }"#;
    let listing: Listing<Submission> = serde_json::from_str(json).unwrap();
    assert_eq!(listing.data.after.as_deref(), Some("t3_bbb"));

    let submissions = listing.into_submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].fullname(), "t3_aaa");
    assert!(!submissions[0].is_approved());
    assert_eq!(submissions[1].approved_by.as_deref(), Some("a_moderator"));
    assert!(submissions[1].is_approved());
}

#[test]
fn deserialize_last_page_has_no_cursor() {
    let json = r#"{"kind": "Listing", "data": {"after": null, "children": []}}"#;
    let listing: Listing<Submission> = serde_json::from_str(json).unwrap();
    assert!(listing.data.after.is_none());
    assert!(listing.into_submissions().is_empty());
}

#[test]
fn missing_optional_fields_default() {
    let json = r#"{"kind": "Listing", "data": {"children": [
        {"kind": "t3", "data": {"name": "t3_min"}}
    ], "after": null}}"#;
    let submissions = serde_json::from_str::<Listing<Submission>>(json)
        .unwrap()
        .into_submissions();
    assert_eq!(submissions[0].url, "");
    assert_eq!(submissions[0].permalink, "");
    assert!(submissions[0].approved_by.is_none());
}

#[test]
fn non_submission_things_are_dropped() {
    // /api/info can hand back comments when given their full-names.
    let json = r#"{"kind": "Listing", "data": {"after": null, "children": [
        {"kind": "t1", "data": {"name": "t1_comment"}},
        {"kind": "t3", "data": {"name": "t3_post"}}
    ]}}"#;
    let submissions = serde_json::from_str::<Listing<Submission>>(json)
        .unwrap()
        .into_submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].fullname(), "t3_post");
}

#[test]
fn permalink_is_made_absolute() {
    let json = r#"{"name": "t3_x", "permalink": "/r/pics/comments/x/title/"}"#;
    let s: Submission = serde_json::from_str(json).unwrap();
    assert_eq!(
        s.permalink_url(),
        "https://www.reddit.com/r/pics/comments/x/title/"
    );
}

#[test]
fn absolute_permalink_is_left_alone() {
    let json = r#"{"name": "t3_x", "permalink": "https://old.reddit.com/r/pics/comments/x/"}"#;
    let s: Submission = serde_json::from_str(json).unwrap();
    assert_eq!(s.permalink_url(), "https://old.reddit.com/r/pics/comments/x/");
}

#[test]
fn deserialize_access_token() {
    let json = r#"{"access_token": "abc.def", "token_type": "bearer", "expires_in": 86400, "scope": "*"}"#;
    let token: AccessToken = serde_json::from_str(json).unwrap();
    assert_eq!(token.access_token, "abc.def");
    assert_eq!(token.expires_in, 86400);
}

#[test]
fn compose_success_has_no_errors() {
    let json = r#"{"json": {"errors": []}}"#;
    let envelope: JsonEnvelope = serde_json::from_str(json).unwrap();
    assert!(envelope.json.errors.is_empty());
    assert_eq!(envelope.json.describe(), "");
}

#[test]
fn compose_errors_are_described() {
    let json = r#"{"json": {"errors": [
        ["USER_DOESNT_EXIST", "that user doesn't exist", "to"],
        ["RATELIMIT", "you are doing that too much", null]
    ]}}"#;
    let envelope: JsonEnvelope = serde_json::from_str(json).unwrap();
    assert_eq!(
        envelope.json.describe(),
        "USER_DOESNT_EXIST: that user doesn't exist: to; RATELIMIT: you are doing that too much"
    );
}
