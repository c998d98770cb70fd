//! Boxed types. Each value is written with its constructor id first, so the
//! reader can tell the variants apart.

use crate::types;

tl_boxed! { Ok { Ok(types::Ok) } }

tl_boxed! {
    /// Channel a login code was (or will be) delivered through.
    AuthenticationCodeType {
        Sms(types::AuthenticationCodeTypeSms),
        Call(types::AuthenticationCodeTypeCall),
        FlashCall(types::AuthenticationCodeTypeFlashCall),
        MissedCall(types::AuthenticationCodeTypeMissedCall),
        Fragment(types::AuthenticationCodeTypeFragment),
    }
}

tl_boxed! {
    AuthenticationCodeInfo { Info(types::AuthenticationCodeInfo) }
}

tl_boxed! {
    AuthorizationState {
        WaitParameters(types::AuthorizationStateWaitParameters),
        WaitPhoneNumber(types::AuthorizationStateWaitPhoneNumber),
        WaitCode(types::AuthorizationStateWaitCode),
        WaitPassword(types::AuthorizationStateWaitPassword),
        WaitRegistration(types::AuthorizationStateWaitRegistration),
        Ready(types::AuthorizationStateReady),
        LoggingOut(types::AuthorizationStateLoggingOut),
        Closing(types::AuthorizationStateClosing),
        Closed(types::AuthorizationStateClosed),
    }
}

tl_boxed! {
    ConnectionState {
        WaitingForNetwork(types::ConnectionStateWaitingForNetwork),
        ConnectingToProxy(types::ConnectionStateConnectingToProxy),
        Connecting(types::ConnectionStateConnecting),
        Updating(types::ConnectionStateUpdating),
        Ready(types::ConnectionStateReady),
    }
}

tl_boxed! { Message { Message(types::Message) } }
tl_boxed! { Chat { Chat(types::Chat) } }
tl_boxed! { User { User(types::User) } }

tl_boxed! {
    UserStatus {
        Empty(types::UserStatusEmpty),
        Online(types::UserStatusOnline),
        Offline(types::UserStatusOffline),
        Recently(types::UserStatusRecently),
    }
}

tl_boxed! { File { File(types::File) } }

tl_boxed! {
    CallState {
        Pending(types::CallStatePending),
        Ready(types::CallStateReady),
        HangingUp(types::CallStateHangingUp),
        Discarded(types::CallStateDiscarded),
    }
}

tl_boxed! { Call { Call(types::Call) } }

tl_boxed! {
    /// Everything the backend may push without being asked.
    Update {
        AuthorizationState(types::UpdateAuthorizationState),
        ConnectionState(types::UpdateConnectionState),
        NewMessage(types::UpdateNewMessage),
        MessageContent(types::UpdateMessageContent),
        DeleteMessages(types::UpdateDeleteMessages),
        NewChat(types::UpdateNewChat),
        ChatTitle(types::UpdateChatTitle),
        ChatLastMessage(types::UpdateChatLastMessage),
        ChatReadInbox(types::UpdateChatReadInbox),
        User(types::UpdateUser),
        UserStatus(types::UpdateUserStatus),
        File(types::UpdateFile),
        Call(types::UpdateCall),
    }
}

tl_boxed! { RpcError { RpcError(types::RpcError) } }
