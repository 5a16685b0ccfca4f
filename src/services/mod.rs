pub mod nextcloud;
