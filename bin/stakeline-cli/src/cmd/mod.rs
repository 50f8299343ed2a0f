pub(crate) mod build_psbt;
pub(crate) mod view;
