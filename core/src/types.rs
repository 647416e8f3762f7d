//! Domain DTOs for the Agenda API.
//!
//! # Design
//! Rust field names are English; the wire keeps the backend's Spanish keys
//! through `#[serde(rename)]`. Ids appear only on response types, never in
//! create/update payloads, so the client cannot assign or change them.
//! Optional fields are skipped when serializing so partial payloads only
//! carry what the caller set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of user roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "profesor")]
    Professor,
    #[serde(rename = "estudiante")]
    Student,
    #[serde(rename = "oficina")]
    Office,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Professor, Role::Student, Role::Office];

    /// Wire value, as used in bodies and the `rol` query filter.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professor => "profesor",
            Role::Student => "estudiante",
            Role::Office => "oficina",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invitation status. Changes only through an explicit update call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InvitationStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "aceptada")]
    Accepted,
    #[serde(rename = "rechazada")]
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pendiente",
            InvitationStatus::Accepted => "aceptada",
            InvitationStatus::Rejected => "rechazada",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nombres")]
    pub names: String,
    #[serde(rename = "apellidos")]
    pub surnames: String,
    /// Enrollment date as sent by the backend.
    #[serde(rename = "fecha", default, skip_serializing_if = "Option::is_none")]
    pub enrolled_on: Option<String>,
    #[serde(rename = "nivel", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "celular", default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "rol", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Student card number ("carnet").
    #[serde(rename = "carnet", default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(rename = "carrera_id", default, skip_serializing_if = "Option::is_none")]
    pub career_id: Option<i64>,
    #[serde(rename = "carrera", default, skip_serializing_if = "Option::is_none")]
    pub career: Option<Career>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Career {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigo")]
    pub code: i64,
    #[serde(rename = "usuarios", default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "creador_id")]
    pub creator_id: i64,
    #[serde(rename = "creador", default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[serde(rename = "invitaciones", default, skip_serializing_if = "Option::is_none")]
    pub invitations: Option<Vec<Invitation>>,
    #[serde(rename = "miembros", default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
}

/// Join entity linking a user to a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    #[serde(rename = "grupo_id")]
    pub group_id: i64,
    #[serde(rename = "usuario", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(rename = "grupo", default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invitation {
    pub id: i64,
    #[serde(rename = "fecha")]
    pub created_at: String,
    pub sender_id: i64,
    /// Free-form identifier of the invitee, usually an email.
    pub receiver: String,
    #[serde(rename = "estado")]
    pub status: InvitationStatus,
    #[serde(rename = "grupo_id")]
    pub group_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
    #[serde(rename = "grupo", default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Partial user used for both create and update. Only the fields that are
/// set are sent; omitted fields keep their server-side value on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInput {
    #[serde(rename = "nombres", skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(rename = "apellidos", skip_serializing_if = "Option::is_none")]
    pub surnames: Option<String>,
    #[serde(rename = "fecha", skip_serializing_if = "Option::is_none")]
    pub enrolled_on: Option<String>,
    #[serde(rename = "nivel", skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(rename = "correo", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "celular", skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "rol", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "carnet", skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(rename = "carrera_id", skip_serializing_if = "Option::is_none")]
    pub career_id: Option<i64>,
}

/// Payload for both creating and updating a career.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CareerInput {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigo")]
    pub code: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewGroup {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "creador_id")]
    pub creator_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupChanges {
    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMember {
    #[serde(rename = "usuario_id")]
    pub user_id: i64,
    #[serde(rename = "grupo_id")]
    pub group_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewInvitation {
    pub sender_id: i64,
    pub receiver: String,
    #[serde(rename = "grupo_id")]
    pub group_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvitationChanges {
    #[serde(rename = "estado")]
    pub status: InvitationStatus,
}

// ---------------------------------------------------------------------------
// List filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "rol", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "carrera_id", skip_serializing_if = "Option::is_none")]
    pub career_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "creador_id", skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "grupo_id", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(rename = "usuario_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvitationFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub status: Option<InvitationStatus>,
    #[serde(rename = "grupo_id", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Auth and auxiliary payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginData {
    #[serde(rename = "usuario")]
    pub user: User,
    #[serde(rename = "sessionToken")]
    pub session_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileData {
    #[serde(rename = "usuario")]
    pub user: User,
}

/// Entry of `GET /usuarios/roles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleOption {
    pub value: String,
    pub label: String,
}

/// Payload of `GET /carreras/:id/usuarios`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CareerUsers {
    #[serde(rename = "carrera")]
    pub career: Career,
    #[serde(rename = "usuarios")]
    pub users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_deserializes_backend_keys() {
        let user: User = serde_json::from_str(
            r#"{"id":7,"nombres":"Ana","apellidos":"López","correo":"ana@uml.edu.ni",
                "rol":"estudiante","carnet":"2024-001","carrera_id":3,"nivel":2}"#,
        )
        .unwrap();
        assert_eq!(user.names, "Ana");
        assert_eq!(user.role, Some(Role::Student));
        assert_eq!(user.student_id.as_deref(), Some("2024-001"));
        assert_eq!(user.career_id, Some(3));
        assert!(user.career.is_none());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<User, _> = serde_json::from_str(
            r#"{"id":1,"nombres":"A","apellidos":"B","correo":"a@b","rol":"decano"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn user_input_only_serializes_set_fields() {
        let input = UserInput {
            names: Some("Luis".to_string()),
            role: Some(Role::Office),
            ..Default::default()
        };
        let body = serde_json::to_value(&input).unwrap();
        assert_eq!(body, serde_json::json!({"nombres": "Luis", "rol": "oficina"}));
    }

    #[test]
    fn invitation_status_uses_spanish_values() {
        let changes = InvitationChanges {
            status: InvitationStatus::Accepted,
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({"estado": "aceptada"})
        );
        assert_eq!(InvitationStatus::Rejected.to_string(), "rechazada");
    }

    #[test]
    fn login_payloads_use_camel_case_keys() {
        let req = LoginRequest {
            access_token: "id-token".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"accessToken":"id-token"}"#
        );

        let data: LoginData = serde_json::from_str(
            r#"{"usuario":{"id":1,"nombres":"A","apellidos":"B","correo":"a@uml.edu.ni"},
                "sessionToken":"s-123"}"#,
        )
        .unwrap();
        assert_eq!(data.session_token, "s-123");
        assert_eq!(data.user.id, 1);
    }

    #[test]
    fn group_embeds_nested_members() {
        let group: Group = serde_json::from_str(
            r#"{"id":2,"nombre":"Tesis","creador_id":1,
                "miembros":[{"id":5,"usuario_id":4,"grupo_id":2}]}"#,
        )
        .unwrap();
        let members = group.members.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, 4);
        assert!(group.invitations.is_none());
    }

    #[test]
    fn role_display_matches_wire_value() {
        for role in Role::ALL {
            let wire = serde_json::to_value(role).unwrap();
            assert_eq!(wire, serde_json::Value::String(role.to_string()));
        }
    }
}
