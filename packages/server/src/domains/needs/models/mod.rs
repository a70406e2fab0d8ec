pub mod client_need;

pub use client_need::{
    ClientNeed, NeedFilter, NeedInsert, NeedPriority, NeedSignature, NeedStatus, NeedUpdate,
    NewClientNeed, StrainType,
};
