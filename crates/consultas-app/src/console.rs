// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    AcceptAnyCredentials, AuthenticationPort, Credentials, FormController, FormError, QueryId,
    QueryResult, RequestGeneration, ResultPager, SessionController, SessionError, SessionState,
    Submission,
};

/// Owns one of each controller and applies the cross-controller effects of
/// every transition. Nothing outside this type mutates the controllers.
#[derive(Debug)]
pub struct Console {
    auth: Box<dyn AuthenticationPort>,
    session: SessionController,
    form: FormController,
    pager: ResultPager,
    status_line: Option<String>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Box::new(AcceptAnyCredentials))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Login(Credentials),
    Exit,
    SelectQuery(QueryId),
    SetField { name: String, value: String },
    Submit,
    Complete {
        generation: RequestGeneration,
        outcome: Result<QueryResult, String>,
    },
    PrevPage,
    NextPage,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    SessionChanged(SessionState),
    QuerySelected(QueryId),
    FieldUpdated(String),
    ValidationFailed(String),
    DispatchRequested(Submission),
    ResultReady { query_id: QueryId, rows: usize },
    DispatchFailed(String),
    StaleResponseDiscarded(RequestGeneration),
    PageChanged(usize),
    Rejected(String),
    StatusUpdated(String),
    StatusCleared,
}

impl Console {
    pub fn new(auth: Box<dyn AuthenticationPort>) -> Self {
        Self {
            auth,
            session: SessionController::default(),
            form: FormController::default(),
            pager: ResultPager::default(),
            status_line: None,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn pager(&self) -> &ResultPager {
        &self.pager
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.form.is_pending()
    }

    pub fn dispatch(&mut self, command: ConsoleCommand) -> Vec<ConsoleEvent> {
        match command {
            ConsoleCommand::Login(credentials) => self.login(&credentials),
            ConsoleCommand::Exit => self.exit(),
            ConsoleCommand::SelectQuery(id) => self.select_query(id),
            ConsoleCommand::SetField { name, value } => self.set_field(&name, value),
            ConsoleCommand::Submit => self.submit(),
            ConsoleCommand::Complete {
                generation,
                outcome,
            } => self.complete(generation, outcome),
            ConsoleCommand::PrevPage => {
                if self.pager.prev_page() {
                    vec![ConsoleEvent::PageChanged(self.pager.page())]
                } else {
                    Vec::new()
                }
            }
            ConsoleCommand::NextPage => {
                if self.pager.next_page() {
                    vec![ConsoleEvent::PageChanged(self.pager.page())]
                } else {
                    Vec::new()
                }
            }
            ConsoleCommand::SetStatus(message) => vec![self.set_status(message)],
            ConsoleCommand::ClearStatus => {
                self.status_line = None;
                vec![ConsoleEvent::StatusCleared]
            }
        }
    }

    fn login(&mut self, credentials: &Credentials) -> Vec<ConsoleEvent> {
        if let Err(error) = self.session.login(self.auth.as_ref(), credentials) {
            return vec![rejected(error)];
        }
        self.form.clear();
        self.pager.clear();
        vec![ConsoleEvent::SessionChanged(self.session.state())]
    }

    fn exit(&mut self) -> Vec<ConsoleEvent> {
        match self.session.exit() {
            Ok(true) => {
                self.form.clear();
                self.pager.clear();
                vec![ConsoleEvent::SessionChanged(SessionState::Exited)]
            }
            Ok(false) => Vec::new(),
            Err(error) => vec![rejected(error)],
        }
    }

    fn select_query(&mut self, id: QueryId) -> Vec<ConsoleEvent> {
        if self.session.state() == SessionState::LoggedOut {
            return vec![rejected(SessionError::NotLoggedIn)];
        }
        if let Err(error) = self.form.select(id) {
            return vec![rejected(error)];
        }
        self.pager.clear();

        let mut events = Vec::new();
        if let Ok(true) = self.session.enter_for_selection() {
            events.push(ConsoleEvent::SessionChanged(SessionState::Active));
        }
        events.push(ConsoleEvent::QuerySelected(id));
        events
    }

    fn set_field(&mut self, name: &str, value: String) -> Vec<ConsoleEvent> {
        if !self.session.is_active() {
            return vec![rejected(SessionError::NotLoggedIn)];
        }
        match self.form.set_field(name, value) {
            Ok(()) => vec![ConsoleEvent::FieldUpdated(name.to_owned())],
            Err(error) => vec![rejected(error)],
        }
    }

    fn submit(&mut self) -> Vec<ConsoleEvent> {
        if !self.session.is_active() {
            return vec![rejected(SessionError::NotLoggedIn)];
        }
        match self.form.submit() {
            Ok(submission) => {
                self.pager.clear();
                vec![ConsoleEvent::DispatchRequested(submission)]
            }
            Err(error @ FormError::MissingField { .. }) => {
                vec![ConsoleEvent::ValidationFailed(error.to_string())]
            }
            Err(error) => vec![rejected(error)],
        }
    }

    fn complete(
        &mut self,
        generation: RequestGeneration,
        outcome: Result<QueryResult, String>,
    ) -> Vec<ConsoleEvent> {
        if !self.form.finish(generation) {
            return vec![ConsoleEvent::StaleResponseDiscarded(generation)];
        }
        let Some(definition) = self.form.selected() else {
            return vec![ConsoleEvent::StaleResponseDiscarded(generation)];
        };

        match outcome {
            Ok(result) => {
                let rows = result.row_count();
                self.pager.set_result(result);
                vec![ConsoleEvent::ResultReady {
                    query_id: definition.id,
                    rows,
                }]
            }
            Err(message) => {
                self.form.record_error(message.clone());
                vec![ConsoleEvent::DispatchFailed(message)]
            }
        }
    }

    fn set_status(&mut self, message: String) -> ConsoleEvent {
        self.status_line = Some(message.clone());
        ConsoleEvent::StatusUpdated(message)
    }
}

fn rejected(error: impl std::error::Error) -> ConsoleEvent {
    ConsoleEvent::Rejected(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Console, ConsoleCommand, ConsoleEvent};
    use crate::{
        AuthenticationPort, CATALOG, CellValue, Credentials, FormValues, QueryId, QueryResult,
        RequestGeneration, SessionError, SessionState, Submission,
    };

    fn active_console() -> Console {
        let mut console = Console::default();
        console.dispatch(ConsoleCommand::Login(Credentials::default()));
        console
    }

    fn set(console: &mut Console, name: &str, value: &str) -> Vec<ConsoleEvent> {
        console.dispatch(ConsoleCommand::SetField {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }

    fn submitted(events: Vec<ConsoleEvent>) -> Submission {
        match events.as_slice() {
            [ConsoleEvent::DispatchRequested(submission)] => submission.clone(),
            other => panic!("expected a dispatch request, got {other:?}"),
        }
    }

    fn rows(count: usize) -> QueryResult {
        QueryResult::new(
            vec!["n".to_owned()],
            (0..count).map(|n| vec![CellValue::Integer(n as i64)]).collect(),
        )
        .expect("single-column rows")
    }

    #[derive(Debug)]
    struct Deny;

    impl AuthenticationPort for Deny {
        fn authenticate(&self, _credentials: &Credentials) -> Result<(), SessionError> {
            Err(SessionError::Rejected("locked".to_owned()))
        }
    }

    #[test]
    fn login_activates_session() {
        let mut console = Console::default();
        let events = console.dispatch(ConsoleCommand::Login(Credentials {
            username: "anyone".to_owned(),
            password: "anything".to_owned(),
        }));
        assert_eq!(events, vec![ConsoleEvent::SessionChanged(SessionState::Active)]);
        assert!(console.form().selected().is_none());
    }

    #[test]
    fn custom_port_can_reject_login() {
        let mut console = Console::new(Box::new(Deny));
        let events = console.dispatch(ConsoleCommand::Login(Credentials::default()));
        assert!(matches!(events.as_slice(), [ConsoleEvent::Rejected(message)] if message.contains("locked")));
        assert_eq!(console.session_state(), SessionState::LoggedOut);
    }

    #[test]
    fn commands_are_gated_while_logged_out() {
        let mut console = Console::default();
        for command in [
            ConsoleCommand::SelectQuery(QueryId::new(1)),
            ConsoleCommand::Submit,
            ConsoleCommand::Exit,
        ] {
            let events = console.dispatch(command);
            assert!(matches!(events.as_slice(), [ConsoleEvent::Rejected(_)]));
        }
        assert_eq!(console.session_state(), SessionState::LoggedOut);
    }

    #[test]
    fn selecting_always_resets_values_result_and_page() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        let submission = submitted(console.dispatch(ConsoleCommand::Submit));
        console.dispatch(ConsoleCommand::Complete {
            generation: submission.generation,
            outcome: Ok(rows(25)),
        });
        console.dispatch(ConsoleCommand::NextPage);
        assert_eq!(console.pager().page(), 2);

        for definition in &CATALOG {
            console.dispatch(ConsoleCommand::SelectQuery(definition.id));
            assert!(console.form().values().is_empty());
            assert!(console.pager().result().is_none());
            assert_eq!(console.pager().page(), 1);
            assert_eq!(console.form().selected().map(|d| d.id), Some(definition.id));
        }
    }

    #[test]
    fn exit_then_select_reenters() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(1)));
        set(&mut console, "courseId", "CS-101");

        let exited = console.dispatch(ConsoleCommand::Exit);
        assert_eq!(exited, vec![ConsoleEvent::SessionChanged(SessionState::Exited)]);
        assert!(console.form().selected().is_none());
        assert!(console.form().values().is_empty());
        assert!(console.dispatch(ConsoleCommand::Exit).is_empty());

        for definition in &CATALOG {
            let mut console = active_console();
            console.dispatch(ConsoleCommand::Exit);
            let events = console.dispatch(ConsoleCommand::SelectQuery(definition.id));
            assert_eq!(
                events,
                vec![
                    ConsoleEvent::SessionChanged(SessionState::Active),
                    ConsoleEvent::QuerySelected(definition.id),
                ]
            );
        }
    }

    #[test]
    fn exit_rejects_field_edits_until_reentry() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(1)));
        console.dispatch(ConsoleCommand::Exit);
        let events = set(&mut console, "courseId", "CS-101");
        assert!(matches!(events.as_slice(), [ConsoleEvent::Rejected(_)]));
    }

    #[test]
    fn successful_dispatch_populates_single_page_result() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(1)));
        set(&mut console, "courseId", "CS-101");
        let submission = submitted(console.dispatch(ConsoleCommand::Submit));
        assert_eq!(
            submission.params,
            FormValues::from_iter([("courseId", "CS-101")])
        );
        assert!(console.is_loading());

        let result = QueryResult::new(vec!["Prereq".to_owned()], vec![vec!["CS-350".into()]])
            .expect("valid result");
        let events = console.dispatch(ConsoleCommand::Complete {
            generation: submission.generation,
            outcome: Ok(result),
        });
        assert_eq!(
            events,
            vec![ConsoleEvent::ResultReady {
                query_id: QueryId::new(1),
                rows: 1
            }]
        );
        assert!(!console.is_loading());
        assert_eq!(console.pager().visible_rows().len(), 1);
        assert!(!console.pager().needs_pagination());
    }

    #[test]
    fn validation_failure_blocks_dispatch() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(2)));
        let events = console.dispatch(ConsoleCommand::Submit);
        assert!(matches!(
            events.as_slice(),
            [ConsoleEvent::ValidationFailed(message)] if message.contains("ID del estudiante")
        ));
        assert!(!console.is_loading());
        assert!(console.form().error().is_some());
    }

    #[test]
    fn failed_dispatch_surfaces_message_and_clears_loading() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        let submission = submitted(console.dispatch(ConsoleCommand::Submit));

        let events = console.dispatch(ConsoleCommand::Complete {
            generation: submission.generation,
            outcome: Err("HTTP 500 Internal Server Error".to_owned()),
        });
        assert_eq!(
            events,
            vec![ConsoleEvent::DispatchFailed(
                "HTTP 500 Internal Server Error".to_owned()
            )]
        );
        assert!(!console.is_loading());
        assert!(console.pager().result().is_none());
        assert!(console.form().error().is_some_and(|message| message.contains("500")));
    }

    #[test]
    fn resubmit_clears_previous_result_before_dispatch() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        let first = submitted(console.dispatch(ConsoleCommand::Submit));
        console.dispatch(ConsoleCommand::Complete {
            generation: first.generation,
            outcome: Ok(rows(3)),
        });
        assert!(console.pager().result().is_some());

        submitted(console.dispatch(ConsoleCommand::Submit));
        assert!(console.pager().result().is_none());
        assert!(console.is_loading());
    }

    #[test]
    fn late_response_for_abandoned_query_is_discarded() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        let abandoned = submitted(console.dispatch(ConsoleCommand::Submit));

        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(1)));
        let events = console.dispatch(ConsoleCommand::Complete {
            generation: abandoned.generation,
            outcome: Ok(rows(4)),
        });
        assert_eq!(
            events,
            vec![ConsoleEvent::StaleResponseDiscarded(abandoned.generation)]
        );
        assert!(console.pager().result().is_none());
    }

    #[test]
    fn response_after_exit_is_discarded() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        let submission = submitted(console.dispatch(ConsoleCommand::Submit));
        console.dispatch(ConsoleCommand::Exit);

        let events = console.dispatch(ConsoleCommand::Complete {
            generation: submission.generation,
            outcome: Ok(rows(2)),
        });
        assert_eq!(
            events,
            vec![ConsoleEvent::StaleResponseDiscarded(submission.generation)]
        );
    }

    #[test]
    fn submit_while_pending_is_rejected() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        submitted(console.dispatch(ConsoleCommand::Submit));
        let events = console.dispatch(ConsoleCommand::Submit);
        assert!(matches!(events.as_slice(), [ConsoleEvent::Rejected(_)]));
    }

    #[test]
    fn paging_reports_only_real_moves() {
        let mut console = active_console();
        console.dispatch(ConsoleCommand::SelectQuery(QueryId::new(9)));
        let submission = submitted(console.dispatch(ConsoleCommand::Submit));
        console.dispatch(ConsoleCommand::Complete {
            generation: submission.generation,
            outcome: Ok(rows(25)),
        });

        assert!(console.dispatch(ConsoleCommand::PrevPage).is_empty());
        assert_eq!(
            console.dispatch(ConsoleCommand::NextPage),
            vec![ConsoleEvent::PageChanged(2)]
        );
        console.dispatch(ConsoleCommand::NextPage);
        assert!(console.dispatch(ConsoleCommand::NextPage).is_empty());
        assert_eq!(console.pager().page(), 3);
    }

    #[test]
    fn stale_generation_number_is_reported() {
        let mut console = active_console();
        let events = console.dispatch(ConsoleCommand::Complete {
            generation: RequestGeneration::new(7),
            outcome: Ok(rows(1)),
        });
        assert_eq!(
            events,
            vec![ConsoleEvent::StaleResponseDiscarded(RequestGeneration::new(7))]
        );
    }

    #[test]
    fn status_line_set_and_clear() {
        let mut console = Console::default();
        console.dispatch(ConsoleCommand::SetStatus("3 rows".to_owned()));
        assert_eq!(console.status_line(), Some("3 rows"));
        assert_eq!(
            console.dispatch(ConsoleCommand::ClearStatus),
            vec![ConsoleEvent::StatusCleared]
        );
        assert_eq!(console.status_line(), None);
    }
}
