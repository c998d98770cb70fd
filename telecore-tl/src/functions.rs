//! RPC functions.

use crate::{enums, Identifiable, RemoteCall, Serializable};

/// `invokeWithToken {X:Type} token:long query:!X = X`
///
/// Wraps any call with the correlation token the backend echoes back in its
/// `rpc_result`.
#[derive(Clone, Debug, PartialEq)]
pub struct InvokeWithToken<X> {
    pub token: i64,
    pub query: X,
}

impl<X> Identifiable for InvokeWithToken<X> {
    const CONSTRUCTOR_ID: u32 = 0x5ca3ee13;
}

impl<X: Serializable> Serializable for InvokeWithToken<X> {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        Self::CONSTRUCTOR_ID.serialize(buf);
        self.token.serialize(buf);
        self.query.serialize(buf);
    }
}

impl<X: RemoteCall> RemoteCall for InvokeWithToken<X> {
    type Return = X::Return;
}

tl_function! { GetAuthorizationState = 0x83ee8595 -> enums::AuthorizationState {} }

tl_function! {
    SetAuthenticationPhoneNumber = 0xfb59d35d -> enums::AuthenticationCodeInfo {
        phone_number: String,
    }
}

tl_function! { ResendAuthenticationCode = 0x14738956 -> enums::Ok {} }

tl_function! {
    CheckAuthenticationCode = 0x1dae7bec -> enums::AuthorizationState { code: String }
}

tl_function! {
    CheckAuthenticationPassword = 0x4c1cb986 -> enums::AuthorizationState { password: String }
}

tl_function! {
    RegisterUser = 0x03e2e269 -> enums::AuthorizationState {
        first_name: String,
        last_name:  String,
    }
}

tl_function! { LogOut = 0x0d81b3cf -> enums::Ok {} }

tl_function! { GetMe = 0xca3f3f62 -> enums::User {} }
