//! Dashboard counters and per-career enrollment.
//!
//! The dashboard asks each collection for a single item and reads the
//! pagination total, except careers, which are listed in full and counted.
//! An unsuccessful envelope counts as zero; transport and HTTP errors are
//! returned to the caller.

use serde::Serialize;
use tracing::debug;

use crate::client::AgendaClient;
use crate::error::ApiError;
use crate::session::Storage;
use crate::transport::Transport;
use crate::types::{Career, GroupFilter, InvitationFilter, User, UserFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub careers: u64,
    pub users: u64,
    pub groups: u64,
    pub invitations: u64,
}

impl DashboardStats {
    /// Issues four requests in order: careers, users, groups, invitations.
    pub fn load<T: Transport, S: Storage>(client: &AgendaClient<T, S>) -> Result<Self, ApiError> {
        let careers = client.careers().list()?;
        let users = client.users().list_by(&UserFilter {
            limit: Some(1),
            ..Default::default()
        })?;
        let groups = client.groups().list_by(&GroupFilter {
            limit: Some(1),
            ..Default::default()
        })?;
        let invitations = client.invitations().list_by(&InvitationFilter {
            limit: Some(1),
            ..Default::default()
        })?;

        let career_count = match (careers.success, &careers.data) {
            (true, Some(list)) => list.len() as u64,
            _ => 0,
        };
        let stats = Self {
            careers: career_count,
            users: users.total_or_zero(),
            groups: groups.total_or_zero(),
            invitations: invitations.total_or_zero(),
        };
        debug!(?stats, "dashboard stats loaded");
        Ok(stats)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerEnrollment<'a> {
    pub career: &'a Career,
    pub enrolled: usize,
}

/// Number of users whose `carrera_id` points at each career, in career order.
pub fn enrollment_by_career<'a>(careers: &'a [Career], users: &[User]) -> Vec<CareerEnrollment<'a>> {
    careers
        .iter()
        .map(|career| CareerEnrollment {
            career,
            enrolled: users
                .iter()
                .filter(|u| u.career_id == Some(career.id))
                .count(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{client, Scripted, BASE_URL};

    fn page(total: u64) -> String {
        format!(
            r#"{{"success":true,"data":[],"pagination":{{"page":1,"limit":1,"total":{total},"pages":{total}}}}}"#
        )
    }

    #[test]
    fn load_counts_each_collection() {
        let careers = r#"{"success":true,"data":[{"id":1,"nombre":"Derecho","codigo":1},{"id":2,"nombre":"Medicina","codigo":5}]}"#;
        let c = client(
            Scripted::new()
                .reply(200, careers)
                .reply(200, &page(120))
                .reply(200, &page(7))
                .reply(200, &page(31)),
        );

        let stats = DashboardStats::load(&c).unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                careers: 2,
                users: 120,
                groups: 7,
                invitations: 31,
            }
        );

        let paths: Vec<String> = c
            .transport()
            .requests()
            .into_iter()
            .map(|r| r.path.trim_start_matches(BASE_URL).to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["/carreras", "/usuarios?limit=1", "/grupos?limit=1", "/invitaciones?limit=1"]
        );
    }

    #[test]
    fn unsuccessful_envelopes_count_as_zero() {
        let c = client(
            Scripted::new()
                .reply(200, r#"{"success":false,"data":[{"id":1,"nombre":"X","codigo":1}]}"#)
                .reply(200, r#"{"success":true,"data":[]}"#)
                .reply(200, r#"{"success":false}"#)
                .reply(200, &page(4)),
        );
        let stats = DashboardStats::load(&c).unwrap();
        assert_eq!(stats.careers, 0);
        assert_eq!(stats.users, 0);
        assert_eq!(stats.groups, 0);
        assert_eq!(stats.invitations, 4);
    }

    #[test]
    fn http_failure_aborts_loading() {
        let c = client(
            Scripted::new()
                .reply(200, r#"{"success":true,"data":[]}"#)
                .reply(401, r#"{"success":false,"message":"Sesión expirada"}"#),
        );
        let err = DashboardStats::load(&c).unwrap_err();
        assert_eq!(err.to_string(), "Sesión expirada");
        assert_eq!(c.transport().requests().len(), 2);
    }

    #[test]
    fn enrollment_counts_users_per_career() {
        let careers: Vec<Career> = serde_json::from_str(
            r#"[{"id":1,"nombre":"Derecho","codigo":1},{"id":2,"nombre":"Medicina","codigo":5}]"#,
        )
        .unwrap();
        let users: Vec<User> = serde_json::from_str(
            r#"[
                {"id":1,"nombres":"A","apellidos":"A","correo":"a@uml.edu.ni","carrera_id":2},
                {"id":2,"nombres":"B","apellidos":"B","correo":"b@uml.edu.ni","carrera_id":2},
                {"id":3,"nombres":"C","apellidos":"C","correo":"c@uml.edu.ni"}
            ]"#,
        )
        .unwrap();

        let counts = enrollment_by_career(&careers, &users);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].career.name, "Derecho");
        assert_eq!(counts[0].enrolled, 0);
        assert_eq!(counts[1].enrolled, 2);
    }
}
