pub mod auth_mechanism;
pub mod client;
pub mod client_response;
pub mod codec;
pub mod connection;
pub mod datatype;
pub mod dispatcher;
pub mod durability_level;
pub mod error;
pub mod ext_frame_code;
pub mod extframe;
pub mod hello_feature;
pub mod magic;
pub mod op_auth_saslauto;
pub mod op_auth_saslbyname;
pub mod op_auth_saslplain;
pub mod op_auth_saslscram;
pub mod op_bootstrap;
pub mod opcode;
pub mod ops_core;
pub mod ops_crud;
pub mod ops_rangescan;
pub mod ops_util;
pub mod packet;
pub mod pendingop;
pub mod rangescan;
pub mod request;
pub mod response;
pub mod status;
pub mod subdoc;
