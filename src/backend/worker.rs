use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use log::debug;

use crate::backend::{Request, Response, ReviewBackend};
use crate::event::AppEvent;

/// Run one request against the backend. Audio requests are not backend
/// work and yield `None`.
pub fn execute<B: ReviewBackend + ?Sized>(backend: &B, request: Request) -> Option<Response> {
    let response = match request {
        Request::FetchSession {
            generation,
            mode,
            fresh,
        } => {
            let result = if fresh {
                backend.fetch_fresh_session(mode)
            } else {
                backend.fetch_session(mode)
            };
            Response::SessionLoaded { generation, result }
        }
        Request::FetchRefresh { generation, mode } => Response::RefreshLoaded {
            generation,
            result: backend.fetch_fresh_session(mode),
        },
        Request::Lookup {
            token,
            word_index,
            lemma_id,
        } => Response::LookupResolved {
            token,
            word_index,
            result: backend.lookup_word(lemma_id),
        },
        Request::Submit { client_id, payload } => Response::Acknowledged {
            action: "submit review",
            result: backend.submit_review(&payload, &client_id),
        },
        Request::Undo { payload } => Response::Acknowledged {
            action: "undo review",
            result: backend.undo_review(&payload),
        },
        Request::Introduce { lemma_id } => Response::Acknowledged {
            action: "introduce word",
            result: backend.introduce_word(lemma_id),
        },
        Request::Suspend { lemma_id } => Response::Acknowledged {
            action: "suspend word",
            result: backend.suspend_word(lemma_id),
        },
        Request::FetchWrapUp {
            generation,
            seen,
            failed,
            session_id,
        } => Response::WrapUpLoaded {
            generation,
            result: backend.fetch_wrap_up_cards(&seen, &failed, session_id.as_deref()),
        },
        Request::PlayAudio { .. } | Request::StopAudio => return None,
    };
    Some(response)
}

/// Hands requests to short-lived threads and posts the responses back on
/// the event channel.
pub struct Worker<B: ReviewBackend + ?Sized + 'static> {
    backend: Arc<B>,
    tx: mpsc::Sender<AppEvent>,
}

impl<B: ReviewBackend + ?Sized + 'static> Worker<B> {
    pub fn new(backend: Arc<B>, tx: mpsc::Sender<AppEvent>) -> Self {
        Self { backend, tx }
    }

    pub fn dispatch(&self, request: Request) {
        if request.is_audio() {
            return;
        }
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        thread::spawn(move || {
            if let Some(response) = execute(backend.as_ref(), request) {
                // The loop may already have quit.
                if tx.send(AppEvent::Response(response)).is_err() {
                    debug!("event loop closed before response was delivered");
                }
            }
        });
    }
}
