mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{eventually, harness, within};
use telecore_client::dispatcher::{delegate_fn, AuthUpdate, Dispatcher, MessageUpdate, UserUpdate};
use telecore_client::update::{Message, MessageDeletion, MessageEdit};
use telecore_client::{AuthorizationState, ChatUpdate, ConnectionState, Update, UpdateEnvelope};
use telecore_tl::{enums, types};

type Log = Arc<Mutex<Vec<String>>>;

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn message(id: i64, chat_id: i64, text: &str) -> Message {
    Message { raw: types::Message { id, chat_id, text: text.into(), ..Default::default() } }
}

fn env(seq: u64, update: Update) -> UpdateEnvelope {
    UpdateEnvelope { seq, update }
}

/// Registers a recording delegate in every slot.
fn record_everything(dispatcher: &Dispatcher, log: &Log) {
    let l = log.clone();
    dispatcher.set_auth_delegate(Some(delegate_fn(move |e: AuthUpdate| {
        let l = l.clone();
        async move { l.lock().unwrap().push(format!("auth {e:?}")) }
    })));
    let l = log.clone();
    dispatcher.set_chat_delegate(Some(delegate_fn(move |e: ChatUpdate| {
        let l = l.clone();
        async move { l.lock().unwrap().push(format!("chat {}", e.chat_id())) }
    })));
    let l = log.clone();
    dispatcher.set_message_delegate(Some(delegate_fn(move |e: MessageUpdate| {
        let l = l.clone();
        async move {
            let what = match e {
                MessageUpdate::New(m)     => format!("new {}", m.id()),
                MessageUpdate::Edited(m)  => format!("edited {}", m.message_id),
                MessageUpdate::Deleted(d) => format!("deleted {:?}", d.message_ids),
            };
            l.lock().unwrap().push(format!("message {what}"))
        }
    })));
    let l = log.clone();
    dispatcher.set_user_delegate(Some(delegate_fn(move |e: UserUpdate| {
        let l = l.clone();
        async move {
            let id = match e {
                UserUpdate::Changed(u)            => u.id,
                UserUpdate::Status { user_id, .. } => user_id,
            };
            l.lock().unwrap().push(format!("user {id}"))
        }
    })));
    let l = log.clone();
    dispatcher.set_file_delegate(Some(delegate_fn(move |f: types::File| {
        let l = l.clone();
        async move { l.lock().unwrap().push(format!("file {}", f.id)) }
    })));
    let l = log.clone();
    dispatcher.set_call_delegate(Some(delegate_fn(move |c: types::Call| {
        let l = l.clone();
        async move { l.lock().unwrap().push(format!("call {}", c.id)) }
    })));
}

#[tokio::test]
async fn each_category_reaches_its_delegate() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    record_everything(&dispatcher, &log);

    let user = types::User {
        id:           11,
        first_name:   "A".into(),
        last_name:    String::new(),
        username:     String::new(),
        phone_number: String::new(),
    };
    let updates = vec![
        Update::AuthorizationState(AuthorizationState::Authorized),
        Update::ConnectionState(ConnectionState::Ready),
        Update::MessageEdited(MessageEdit { chat_id: 1, message_id: 4, text: "x".into(), edit_date: 0 }),
        Update::MessagesDeleted(MessageDeletion { chat_id: 1, message_ids: vec![4, 5], permanent: true }),
        Update::Chat(ChatUpdate::TitleChanged { chat_id: 2, title: "t".into() }),
        Update::User(user),
        Update::UserStatus { user_id: 12, status: types::UserStatusRecently {}.into() },
        Update::File(types::File { id: 3, size: 10, downloaded_size: 0, is_downloading_completed: false }),
        Update::Call(types::Call {
            id:          8,
            user_id:     11,
            is_outgoing: false,
            state:       enums::CallState::from(types::CallStatePending {}),
        }),
    ];
    for (seq, update) in updates.into_iter().enumerate() {
        dispatcher.handle_update(env(seq as u64 + 1, update)).await;
    }

    assert_eq!(entries(&log), vec![
        format!("auth {:?}", AuthUpdate::AuthorizationState { seq: 1, state: AuthorizationState::Authorized }),
        format!("auth {:?}", AuthUpdate::ConnectionState { seq: 2, state: ConnectionState::Ready }),
        "message edited 4".to_string(),
        "message deleted [4, 5]".to_string(),
        "chat 2".to_string(),
        "user 11".to_string(),
        "user 12".to_string(),
        "file 3".to_string(),
        "call 8".to_string(),
    ]);
}

#[tokio::test]
async fn new_message_goes_to_message_then_chat() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    let last: Arc<Mutex<Option<ChatUpdate>>> = Arc::default();
    record_everything(&dispatcher, &log);

    let seen = last.clone();
    let l = log.clone();
    dispatcher.set_chat_delegate(Some(delegate_fn(move |e: ChatUpdate| {
        let (seen, l) = (seen.clone(), l.clone());
        async move {
            l.lock().unwrap().push(format!("chat {}", e.chat_id()));
            *seen.lock().unwrap() = Some(e);
        }
    })));

    dispatcher.handle_update(env(1, Update::NewMessage(message(30, 9, "hello")))).await;

    assert_eq!(entries(&log), vec!["message new 30", "chat 9"]);
    assert_eq!(
        last.lock().unwrap().clone(),
        Some(ChatUpdate::LastMessageChanged { chat_id: 9, message: Some(message(30, 9, "hello")) }),
    );
}

#[tokio::test]
async fn chat_slot_cleared_during_message_handling_is_respected() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    record_everything(&dispatcher, &log);

    let d = dispatcher.clone();
    let l = log.clone();
    dispatcher.set_message_delegate(Some(delegate_fn(move |_: MessageUpdate| {
        let (d, l) = (d.clone(), l.clone());
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            d.set_chat_delegate(None);
            l.lock().unwrap().push("message handled".into());
        }
    })));

    dispatcher.handle_update(env(1, Update::NewMessage(message(31, 9, "bye")))).await;

    assert_eq!(entries(&log), vec!["message handled"]);
}

#[tokio::test]
async fn empty_slots_are_skipped() {
    let dispatcher = Dispatcher::new();
    dispatcher.handle_update(env(1, Update::NewMessage(message(1, 1, "")))).await;
    dispatcher.handle_update(env(2, Update::ConnectionState(ConnectionState::Updating))).await;
}

#[tokio::test]
async fn last_registration_wins_and_none_clears() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();

    for name in ["first", "second"] {
        let l = log.clone();
        dispatcher.set_file_delegate(Some(delegate_fn(move |f: types::File| {
            let l = l.clone();
            async move { l.lock().unwrap().push(format!("{name} {}", f.id)) }
        })));
    }
    let file = |id| Update::File(types::File { id, size: 0, downloaded_size: 0, is_downloading_completed: true });

    dispatcher.handle_update(env(1, file(1))).await;
    dispatcher.set_file_delegate(None);
    dispatcher.handle_update(env(2, file(2))).await;

    assert_eq!(entries(&log), vec!["second 1"]);
}

#[tokio::test]
async fn slow_message_delegate_does_not_reorder_chat_updates() {
    let h = harness().await;
    let stream = h.rpc.updates().await.unwrap();
    let dispatcher = Dispatcher::new();
    let log = Log::default();

    let l = log.clone();
    dispatcher.set_message_delegate(Some(delegate_fn(move |e: MessageUpdate| {
        let l = l.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if let MessageUpdate::New(m) = e {
                l.lock().unwrap().push(format!("message {}", m.id()));
            }
        }
    })));
    let l = log.clone();
    dispatcher.set_chat_delegate(Some(delegate_fn(move |e: ChatUpdate| {
        let l = l.clone();
        async move {
            let what = match e {
                ChatUpdate::LastMessageChanged { chat_id, .. } => format!("last {chat_id}"),
                ChatUpdate::UnreadCountChanged { chat_id, .. } => format!("unread {chat_id}"),
                other => format!("{other:?}"),
            };
            l.lock().unwrap().push(what);
        }
    })));
    let task = dispatcher.spawn(stream);

    let last = types::Message { id: 1, chat_id: 5, ..Default::default() };
    h.peer.push(&enums::Update::from(types::UpdateChatLastMessage {
        chat_id:      5,
        last_message: Some(last.into()),
    }));
    h.peer.push(&enums::Update::from(types::UpdateNewMessage {
        message: types::Message { id: 2, chat_id: 6, ..Default::default() }.into(),
    }));
    h.peer.push(&enums::Update::from(types::UpdateChatReadInbox {
        chat_id:                    5,
        last_read_inbox_message_id: 1,
        unread_count:               0,
    }));

    eventually(|| log.lock().unwrap().len() == 4).await;
    assert_eq!(entries(&log), vec!["last 5", "message 2", "last 6", "unread 5"]);

    h.rpc.stop().await;
    within(task).await.unwrap();
}

#[tokio::test]
async fn long_runs_stay_in_order() {
    let h = harness().await;
    let stream = h.rpc.updates().await.unwrap();
    let dispatcher = Dispatcher::new();
    let titles: Arc<Mutex<Vec<String>>> = Arc::default();

    let t = titles.clone();
    dispatcher.set_chat_delegate(Some(delegate_fn(move |e: ChatUpdate| {
        let t = t.clone();
        async move {
            tokio::task::yield_now().await;
            if let ChatUpdate::TitleChanged { title, .. } = e {
                t.lock().unwrap().push(title);
            }
        }
    })));
    let task = dispatcher.spawn(stream);

    for i in 0..200 {
        h.peer.push(&enums::Update::from(types::UpdateChatTitle { chat_id: 1, title: i.to_string() }));
    }
    eventually(|| titles.lock().unwrap().len() == 200).await;
    let expected: Vec<String> = (0..200).map(|i: i32| i.to_string()).collect();
    assert_eq!(*titles.lock().unwrap(), expected);

    h.rpc.stop().await;
    within(task).await.unwrap();
}
