//! Typed CRUD access to the REST collections.
//!
//! # Design
//! Every collection shares the same list/get/create/update/delete shape, so
//! the methods are written once on [`ResourceClient`] and specialised by a
//! zero-sized descriptor implementing [`Resource`]. Capabilities a
//! collection lacks are simply not implemented for its descriptor: members
//! have no update endpoint (no [`Updatable`]) and careers take no list
//! filters (no [`Filterable`]). Endpoints specific to one collection are
//! inherent methods on that collection's `ResourceClient`.
//!
//! All resource calls require authentication.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{Ack, AgendaClient};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::query;
use crate::session::Storage;
use crate::transport::Transport;
use crate::types::{
    Career, CareerInput, CareerUsers, Group, GroupChanges, GroupFilter, Invitation,
    InvitationChanges, InvitationFilter, Member, MemberFilter, NewGroup, NewInvitation, NewMember,
    RoleOption, User, UserFilter, UserInput,
};

/// Describes one REST collection.
pub trait Resource {
    /// Collection path relative to the base URL, e.g. `/usuarios`.
    const PATH: &'static str;
    type Entity: DeserializeOwned;
    type Create: Serialize;
}

/// Collections that accept `PUT {PATH}/:id`.
pub trait Updatable: Resource {
    type Update: Serialize;
}

/// Collections whose list endpoint accepts query filters.
pub trait Filterable: Resource {
    type Filter: Serialize;
}

#[derive(Debug, Clone, Copy)]
pub struct Users;

impl Resource for Users {
    const PATH: &'static str = "/usuarios";
    type Entity = User;
    type Create = UserInput;
}

impl Updatable for Users {
    type Update = UserInput;
}

impl Filterable for Users {
    type Filter = UserFilter;
}

#[derive(Debug, Clone, Copy)]
pub struct Careers;

impl Resource for Careers {
    const PATH: &'static str = "/carreras";
    type Entity = Career;
    type Create = CareerInput;
}

impl Updatable for Careers {
    type Update = CareerInput;
}

#[derive(Debug, Clone, Copy)]
pub struct Groups;

impl Resource for Groups {
    const PATH: &'static str = "/grupos";
    type Entity = Group;
    type Create = NewGroup;
}

impl Updatable for Groups {
    type Update = GroupChanges;
}

impl Filterable for Groups {
    type Filter = GroupFilter;
}

#[derive(Debug, Clone, Copy)]
pub struct Members;

impl Resource for Members {
    const PATH: &'static str = "/miembros";
    type Entity = Member;
    type Create = NewMember;
}

impl Filterable for Members {
    type Filter = MemberFilter;
}

#[derive(Debug, Clone, Copy)]
pub struct Invitations;

impl Resource for Invitations {
    const PATH: &'static str = "/invitaciones";
    type Entity = Invitation;
    type Create = NewInvitation;
}

impl Updatable for Invitations {
    type Update = InvitationChanges;
}

impl Filterable for Invitations {
    type Filter = InvitationFilter;
}

/// Borrowing handle performing one collection's operations through a client.
pub struct ResourceClient<'a, R, T, S> {
    client: &'a AgendaClient<T, S>,
    _resource: PhantomData<R>,
}

impl<'a, R, T, S> ResourceClient<'a, R, T, S> {
    pub fn new(client: &'a AgendaClient<T, S>) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource, T: Transport, S: Storage> ResourceClient<'_, R, T, S> {
    fn item_path(id: i64) -> String {
        format!("{}/{id}", R::PATH)
    }

    /// `GET {PATH}` without filters.
    pub fn list(&self) -> Result<Envelope<Vec<R::Entity>>, ApiError> {
        self.client.get(R::PATH)
    }

    pub fn get(&self, id: i64) -> Result<Envelope<R::Entity>, ApiError> {
        self.client.get(&Self::item_path(id))
    }

    pub fn create(&self, body: &R::Create) -> Result<Envelope<R::Entity>, ApiError> {
        self.client.post(R::PATH, body)
    }

    pub fn delete(&self, id: i64) -> Result<Ack, ApiError> {
        self.client.delete(&Self::item_path(id))
    }
}

impl<R: Updatable, T: Transport, S: Storage> ResourceClient<'_, R, T, S> {
    pub fn update(&self, id: i64, body: &R::Update) -> Result<Envelope<R::Entity>, ApiError> {
        self.client.put(&Self::item_path(id), body)
    }
}

impl<R: Filterable, T: Transport, S: Storage> ResourceClient<'_, R, T, S> {
    /// `GET {PATH}?...` with only the filter fields that are set.
    pub fn list_by(&self, filter: &R::Filter) -> Result<Envelope<Vec<R::Entity>>, ApiError> {
        self.client.get(&query::with_query(R::PATH, filter)?)
    }
}

impl<T: Transport, S: Storage> ResourceClient<'_, Users, T, S> {
    /// `GET /usuarios/roles`.
    pub fn roles(&self) -> Result<Envelope<Vec<RoleOption>>, ApiError> {
        self.client.get("/usuarios/roles")
    }
}

impl<T: Transport, S: Storage> ResourceClient<'_, Careers, T, S> {
    /// `GET /carreras/:id/usuarios`.
    pub fn users(&self, career_id: i64) -> Result<Envelope<CareerUsers>, ApiError> {
        self.client.get(&format!("/carreras/{career_id}/usuarios"))
    }
}

impl<T: Transport, S: Storage> ResourceClient<'_, Groups, T, S> {
    /// Groups the user belongs to, `GET /grupos/usuario/:id`.
    pub fn of_user(&self, user_id: i64) -> Result<Envelope<Vec<Group>>, ApiError> {
        self.client.get(&format!("/grupos/usuario/{user_id}"))
    }
}

impl<T: Transport, S: Storage> ResourceClient<'_, Members, T, S> {
    pub fn of_group(&self, group_id: i64) -> Result<Envelope<Vec<Member>>, ApiError> {
        self.client.get(&format!("/miembros/grupo/{group_id}"))
    }

    pub fn of_user(&self, user_id: i64) -> Result<Envelope<Vec<Member>>, ApiError> {
        self.client.get(&format!("/miembros/usuario/{user_id}"))
    }

    /// Remove a membership by its endpoints rather than its id.
    pub fn remove_from_group(&self, group_id: i64, user_id: i64) -> Result<Ack, ApiError> {
        self.client
            .delete(&format!("/miembros/grupo/{group_id}/usuario/{user_id}"))
    }
}

impl<T: Transport, S: Storage> AgendaClient<T, S> {
    pub fn users(&self) -> ResourceClient<'_, Users, T, S> {
        ResourceClient::new(self)
    }

    pub fn careers(&self) -> ResourceClient<'_, Careers, T, S> {
        ResourceClient::new(self)
    }

    pub fn groups(&self) -> ResourceClient<'_, Groups, T, S> {
        ResourceClient::new(self)
    }

    pub fn members(&self) -> ResourceClient<'_, Members, T, S> {
        ResourceClient::new(self)
    }

    pub fn invitations(&self) -> ResourceClient<'_, Invitations, T, S> {
        ResourceClient::new(self)
    }
}
