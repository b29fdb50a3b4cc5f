use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, ErrorKind};

pub use server::{ServerState, router, run, run_with_listener};

mod balances;
mod expenses;
mod groups;
mod server;
mod settlements;
mod user;
mod views;

pub mod types {
    pub mod user {
        pub use api_types::user::{FriendsResponse, UserView};
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseCreated, ExpenseListResponse, ExpenseNew, ExpenseView, OwedExpenseView,
            OwedExpensesResponse, RelatedExpensesResponse, SplitNew, SplitView,
        };
    }

    pub mod settlement {
        pub use api_types::settlement::{
            EntryError, GroupSettleUp, GroupSettleUpEntry, GroupSettleUpResponse, SettleUp,
            SettlementCreated, SettlementListResponse, SettlementView,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalanceView, CounterpartiesResponse, CounterpartyView};
    }

    pub mod group {
        pub use api_types::group::{GroupBalancesResponse, MemberBalanceView, MembersResponse};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

impl ServerError {
    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Engine(EngineError::Forbidden(message.into()))
    }
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
