//! Graph operations the client sends, and the cache queries that read them.
//!
//! Each [`Operation`] is the wire document sent to the endpoint. The matching
//! builder returns the [`Query`] used to normalize its response and read it
//! back, with local fields marked so they are never sent.

use launchpad_core::LaunchId;

use crate::query::{Query, Selection};

/// A named graph operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// `operationName` on the wire.
    pub name: &'static str,
    /// Full document text.
    pub document: &'static str,
}

pub const LAUNCH_LIST: Operation = Operation {
    name: "LaunchList",
    document: r"query LaunchList($after: String, $pageSize: Int) {
  launches(after: $after, pageSize: $pageSize) {
    __typename
    cursor
    hasMore
    launches {
      __typename
      id
      isBooked
      rocket { __typename id name }
      mission { __typename name missionPatch(size: SMALL) }
    }
  }
}",
};

pub const LAUNCH_DETAILS: Operation = Operation {
    name: "LaunchDetails",
    document: r"query LaunchDetails($id: ID!) {
  launch(id: $id) {
    __typename
    id
    isBooked
    site
    rocket { __typename id name type }
    mission { __typename name missionPatch(size: LARGE) }
  }
}",
};

pub const GET_MY_TRIPS: Operation = Operation {
    name: "GetMyTrips",
    document: r"query GetMyTrips {
  me {
    __typename
    id
    email
    trips {
      __typename
      id
      isBooked
      rocket { __typename id name }
      mission { __typename name missionPatch(size: SMALL) }
    }
  }
}",
};

pub const LOGIN: Operation = Operation {
    name: "Login",
    document: r"mutation Login($email: String!) {
  login(email: $email)
}",
};

pub const BOOK_TRIPS: Operation = Operation {
    name: "BookTrips",
    document: r"mutation BookTrips($launchIds: [ID]!) {
  bookTrips(launchIds: $launchIds) {
    success
    message
    launches { __typename id isBooked }
  }
}",
};

pub const CANCEL_TRIP: Operation = Operation {
    name: "CancelTrip",
    document: r"mutation CancelTrip($launchId: ID!) {
  cancelTrip(launchId: $launchId) {
    success
    message
    launches { __typename id isBooked }
  }
}",
};

/// Every operation the client knows, for dispatch tables and tests.
pub const ALL: [Operation; 6] = [
    LAUNCH_LIST,
    LAUNCH_DETAILS,
    GET_MY_TRIPS,
    LOGIN,
    BOOK_TRIPS,
    CANCEL_TRIP,
];

fn launch_tile(patch_size: &str) -> Vec<Selection> {
    vec![
        Selection::field("id"),
        Selection::field("isBooked"),
        Selection::entity(
            "rocket",
            "Rocket",
            vec![Selection::field("id"), Selection::field("name")],
        ),
        Selection::object(
            "mission",
            vec![
                Selection::field("name"),
                Selection::field("missionPatch").arg("size", patch_size),
            ],
        ),
        Selection::local("isInCart"),
    ]
}

/// Root session flags; always readable without a fetch.
#[must_use]
pub fn session_flags() -> Query {
    Query::new(
        "SessionFlags",
        vec![Selection::local("isLoggedIn"), Selection::local("cartItems")],
    )
}

/// First page (and every merged page) of the launch list.
#[must_use]
pub fn launch_list() -> Query {
    Query::new(
        LAUNCH_LIST.name,
        vec![Selection::connection(
            "launches",
            "launches",
            "Launch",
            launch_tile("SMALL"),
        )],
    )
}

/// One launch with its detail fields.
#[must_use]
pub fn launch_details(id: &LaunchId) -> Query {
    Query::new(
        LAUNCH_DETAILS.name,
        vec![
            Selection::entity(
                "launch",
                "Launch",
                vec![
                    Selection::field("id"),
                    Selection::field("isBooked"),
                    Selection::field("site"),
                    Selection::entity(
                        "rocket",
                        "Rocket",
                        vec![
                            Selection::field("id"),
                            Selection::field("name"),
                            Selection::field("type"),
                        ],
                    ),
                    Selection::object(
                        "mission",
                        vec![
                            Selection::field("name"),
                            Selection::field("missionPatch").arg("size", "LARGE"),
                        ],
                    ),
                    Selection::local("isInCart"),
                ],
            )
            .arg("id", id.as_str()),
        ],
    )
}

/// The signed-in user and their booked launches.
#[must_use]
pub fn my_trips() -> Query {
    Query::new(
        GET_MY_TRIPS.name,
        vec![Selection::entity(
            "me",
            "User",
            vec![
                Selection::field("id"),
                Selection::field("email"),
                Selection::entity("trips", "Launch", launch_tile("SMALL")),
            ],
        )],
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::local::LocalFieldRegistry;
    use crate::query::QueryPlan;

    #[test]
    fn test_every_query_compiles_against_default_registry() {
        let registry = LocalFieldRegistry::default();
        for query in [
            session_flags(),
            launch_list(),
            launch_details(&LaunchId::from("109")),
            my_trips(),
        ] {
            QueryPlan::compile(&query, &registry).unwrap();
        }
    }

    #[test]
    fn test_documents_name_their_operation() {
        for op in ALL {
            assert!(op.document.contains(op.name), "{} document", op.name);
        }
    }

    #[test]
    fn test_local_fields_stay_out_of_documents() {
        for op in ALL {
            assert!(!op.document.contains("isInCart"));
            assert!(!op.document.contains("isLoggedIn"));
            assert!(!op.document.contains("cartItems"));
        }
    }
}
